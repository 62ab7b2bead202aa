//! # Promotion Repository
//!
//! Promotion records and per-customer redemption history.
//!
//! Codes are stored upper-case and are not unique: a seasonal code can be
//! re-issued as a new record, and the engine picks among all records that
//! share it.

use std::collections::HashMap;

use brewline_core::promotion::normalize_code;
use brewline_core::{Promotion, PromotionKind};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    code: String,
    name: String,
    kind: String,
    priority: i32,
    is_active: bool,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    min_subtotal_cents: Option<i64>,
    max_uses_per_customer: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = DbError;

    fn try_from(row: PromotionRow) -> DbResult<Self> {
        let kind: PromotionKind = serde_json::from_str(&row.kind)
            .map_err(|e| DbError::invalid_data(format!("promotion {} kind", row.id), e))?;

        let max_uses_per_customer = row
            .max_uses_per_customer
            .map(u32::try_from)
            .transpose()
            .map_err(|e| DbError::invalid_data(format!("promotion {} max uses", row.id), e))?;

        Ok(Promotion {
            id: row.id,
            code: row.code,
            name: row.name,
            kind,
            priority: row.priority,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            min_subtotal_cents: row.min_subtotal_cents,
            max_uses_per_customer,
            created_at: row.created_at,
        })
    }
}

const PROMOTION_COLUMNS: &str = "id, code, name, kind, priority, is_active, starts_at, ends_at, \
     min_subtotal_cents, max_uses_per_customer, created_at";

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Gets a promotion by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let sql = format!("SELECT {} FROM promotions WHERE id = ?1", PROMOTION_COLUMNS);
        let row: Option<PromotionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Promotion::try_from).transpose()
    }

    /// Every record carrying `code`, active or not.
    ///
    /// Inactive and expired records are returned too, so the engine can
    /// report *why* a code doesn't apply instead of "not found".
    pub async fn find_by_code(&self, code: &str) -> DbResult<Vec<Promotion>> {
        let code = normalize_code(code);
        debug!(code = %code, "Looking up promotion code");

        let sql = format!(
            "SELECT {} FROM promotions WHERE code = ?1 \
             ORDER BY priority DESC, created_at DESC",
            PROMOTION_COLUMNS
        );
        let rows: Vec<PromotionRow> = sqlx::query_as(&sql)
            .bind(code)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Promotion::try_from).collect()
    }

    /// Promotions that are active and inside their window at `now`.
    pub async fn list_active(&self, now: DateTime<Utc>) -> DbResult<Vec<Promotion>> {
        let sql = format!(
            "SELECT {} FROM promotions \
             WHERE is_active = 1 AND starts_at <= ?1 AND (ends_at IS NULL OR ends_at >= ?1) \
             ORDER BY priority DESC, created_at DESC",
            PROMOTION_COLUMNS
        );
        let rows: Vec<PromotionRow> = sqlx::query_as(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Promotion::try_from).collect()
    }

    /// Inserts a promotion. The code is stored normalized.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        info!(id = %promotion.id, code = %promotion.code, "Inserting promotion");

        let kind = serde_json::to_string(&promotion.kind)
            .map_err(|e| DbError::invalid_data("promotion kind", e))?;

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, code, name, kind, priority, is_active,
                starts_at, ends_at, min_subtotal_cents, max_uses_per_customer, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&promotion.id)
        .bind(normalize_code(&promotion.code))
        .bind(&promotion.name)
        .bind(kind)
        .bind(promotion.priority)
        .bind(promotion.is_active)
        .bind(promotion.starts_at)
        .bind(promotion.ends_at)
        .bind(promotion.min_subtotal_cents)
        .bind(promotion.max_uses_per_customer.map(i64::from))
        .bind(promotion.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of times `customer_id` redeemed `promotion_id`.
    pub async fn redemption_count(&self, promotion_id: &str, customer_id: &str) -> DbResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM promotion_redemptions \
             WHERE promotion_id = ?1 AND customer_id = ?2",
        )
        .bind(promotion_id)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Redemption counts of one customer across `promotions`, keyed the way
    /// the promotion engine's `RedemptionCounts` lookup expects.
    pub async fn redemption_counts(
        &self,
        customer_id: &str,
        promotions: &[Promotion],
    ) -> DbResult<HashMap<(String, String), u32>> {
        if promotions.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::new(
            "SELECT promotion_id, COUNT(*) FROM promotion_redemptions WHERE customer_id = ",
        );
        builder.push_bind(customer_id);
        builder.push(" AND promotion_id IN (");
        let mut separated = builder.separated(", ");
        for promotion in promotions {
            separated.push_bind(promotion.id.as_str());
        }
        separated.push_unseparated(") GROUP BY promotion_id");

        let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(promotion_id, count)| {
                (
                    (promotion_id, customer_id.to_string()),
                    u32::try_from(count).unwrap_or(u32::MAX),
                )
            })
            .collect())
    }

    /// Records a redemption outside of checkout (manual adjustments).
    ///
    /// Checkout records its redemption inside the order transaction.
    pub async fn record_redemption(
        &self,
        promotion_id: &str,
        customer_id: &str,
        order_id: &str,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        info!(promotion_id, customer_id, order_id, "Recording promotion redemption");

        sqlx::query(
            "INSERT INTO promotion_redemptions (id, promotion_id, customer_id, order_id, redeemed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(promotion_id)
        .bind(customer_id)
        .bind(order_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    pub(crate) fn promotion(id: &str, code: &str, kind: PromotionKind) -> Promotion {
        Promotion {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("{} promo", code),
            kind,
            priority: 0,
            is_active: true,
            starts_at: Utc::now() - Duration::days(1),
            ends_at: None,
            min_subtotal_cents: None,
            max_uses_per_customer: None,
            created_at: Utc::now() - Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_code_normalizes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();

        let mut promo = promotion("p1", "welcome10", PromotionKind::Percentage { percent: 10 });
        promo.max_uses_per_customer = Some(1);
        promo.ends_at = Some(Utc::now() + Duration::days(30));
        repo.insert(&promo).await.unwrap();

        let found = repo.find_by_code(" Welcome10 ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "WELCOME10");
        assert_eq!(found[0].kind, PromotionKind::Percentage { percent: 10 });
        assert_eq!(found[0].max_uses_per_customer, Some(1));

        assert!(repo.find_by_code("NOPE").await.unwrap().is_empty());
        assert!(repo.get_by_id("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_shared_code_orders_by_priority() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();

        repo.insert(&promotion("low", "SPRING", PromotionKind::FixedAmount { amount_cents: 50 }))
            .await
            .unwrap();
        let mut high = promotion("high", "SPRING", PromotionKind::FixedAmount { amount_cents: 100 });
        high.priority = 5;
        repo.insert(&high).await.unwrap();

        let found = repo.find_by_code("spring").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "high");
    }

    #[tokio::test]
    async fn test_list_active_filters_window_and_flag() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();
        let kind = PromotionKind::Percentage { percent: 5 };

        repo.insert(&promotion("live", "LIVE", kind.clone())).await.unwrap();

        let mut inactive = promotion("off", "OFF", kind.clone());
        inactive.is_active = false;
        repo.insert(&inactive).await.unwrap();

        let mut ended = promotion("ended", "ENDED", kind.clone());
        ended.ends_at = Some(Utc::now() - Duration::hours(1));
        repo.insert(&ended).await.unwrap();

        let mut future = promotion("future", "FUTURE", kind);
        future.starts_at = Utc::now() + Duration::days(2);
        repo.insert(&future).await.unwrap();

        let active = repo.list_active(Utc::now()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "live");
    }

    #[tokio::test]
    async fn test_corrupt_kind_is_invalid_data() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO promotions (id, code, name, kind, starts_at, created_at) \
             VALUES ('bad', 'BAD', 'Bad', '{\"type\":\"mystery\"}', ?1, ?1)",
        )
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        assert!(matches!(
            db.promotions().find_by_code("BAD").await,
            Err(DbError::InvalidData { .. })
        ));
    }
}
