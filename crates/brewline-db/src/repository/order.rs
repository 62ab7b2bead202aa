//! # Order Repository
//!
//! Checkout writes, customer tracking lookups and staff status updates.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE (checkout)                                                   │
//! │     └── create_order() in ONE transaction:                              │
//! │         ├── orders                   header, totals, tracking code      │
//! │         ├── order_items              per drink, nutrition snapshot      │
//! │         ├── order_item_ingredients   base + extra lines per drink       │
//! │         └── promotion_redemptions    when a customer redeemed a code    │
//! │                                      (usage cap re-checked first)       │
//! │                                                                         │
//! │  2. TRACK (customer)                                                    │
//! │     └── get_by_tracking_code() + details()                              │
//! │                                                                         │
//! │  3. ADVANCE (staff)                                                     │
//! │     └── update_status(id, expected, desired)                            │
//! │         UPDATE ... WHERE id = ? AND status = expected RETURNING ...     │
//! │         0 rows → NotFound, or Conflict with the persisted status        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing but `status` and `updated_at` changes after creation.

use brewline_core::fulfillment::{check_transition, normalize_tracking_code};
use brewline_core::{
    LineRole, Macros, MeasureUnit, Order, OrderItem, OrderItemIngredient, OrderStatus,
    TransitionError,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// =============================================================================
// Write / Read Models
// =============================================================================

/// One ordered drink with its ingredient lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: OrderItem,
    pub ingredients: Vec<OrderItemIngredient>,
}

/// Everything checkout persists for one order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// An order with its drinks, as shown to the customer and the bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    drink_id: String,
    drink_name_snapshot: String,
    size_name_snapshot: String,
    size_ml: f64,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
    nutrition: String,
    nutrition_complete: bool,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DbError;

    fn try_from(row: OrderItemRow) -> DbResult<Self> {
        let nutrition: Macros = serde_json::from_str(&row.nutrition)
            .map_err(|e| DbError::invalid_data(format!("order item {} nutrition", row.id), e))?;

        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            drink_id: row.drink_id,
            drink_name_snapshot: row.drink_name_snapshot,
            size_name_snapshot: row.size_name_snapshot,
            size_ml: row.size_ml,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            line_total_cents: row.line_total_cents,
            nutrition,
            nutrition_complete: row.nutrition_complete,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemIngredientRow {
    id: String,
    order_item_id: String,
    ingredient_id: String,
    ingredient_name_snapshot: String,
    amount: f64,
    unit: MeasureUnit,
    role: LineRole,
    grams: f64,
    price_cents: i64,
}

impl From<OrderItemIngredientRow> for OrderItemIngredient {
    fn from(row: OrderItemIngredientRow) -> Self {
        OrderItemIngredient {
            id: row.id,
            order_item_id: row.order_item_id,
            ingredient_id: row.ingredient_id,
            ingredient_name_snapshot: row.ingredient_name_snapshot,
            amount: row.amount,
            unit: row.unit,
            role: row.role,
            grams: row.grams,
            price_cents: row.price_cents,
        }
    }
}

const ORDER_COLUMNS: &str = "id, tracking_code, status, customer_id, contact_name, contact_phone, \
     contact_email, pickup_at, payment_method, payment_reference, subtotal_cents, discount_cents, \
     total_cents, promotion_id, promotion_code, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a whole order atomically.
    ///
    /// Header, items, ingredient lines and (for an identified customer
    /// redeeming a promotion) the redemption record commit together or not
    /// at all. A tracking code collision surfaces as `UniqueViolation` and
    /// leaves nothing behind; the caller regenerates the code and retries.
    /// A customer who reached the promotion's usage cap since checkout
    /// priced the order gets `RedemptionLimit`, also with nothing written.
    pub async fn create_order(&self, new_order: &NewOrder) -> DbResult<()> {
        let order = &new_order.order;
        debug!(
            id = %order.id,
            tracking_code = %order.tracking_code,
            items = new_order.lines.len(),
            "Creating order"
        );

        let mut tx = self.pool.begin().await?;

        insert_header(&mut tx, order).await?;

        for (position, line) in new_order.lines.iter().enumerate() {
            insert_item(&mut tx, &line.item, position as i64).await?;
            for (position, ingredient) in line.ingredients.iter().enumerate() {
                insert_item_ingredient(&mut tx, ingredient, position as i64).await?;
            }
        }

        if let (Some(promotion_id), Some(customer_id)) = (&order.promotion_id, &order.customer_id)
        {
            // The header insert holds the write lock, so this count cannot
            // go stale before commit.
            check_redemption_limit(&mut tx, order, promotion_id, customer_id).await?;

            sqlx::query(
                "INSERT INTO promotion_redemptions \
                 (id, promotion_id, customer_id, order_id, redeemed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(promotion_id)
            .bind(customer_id)
            .bind(&order.id)
            .bind(order.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            id = %order.id,
            tracking_code = %order.tracking_code,
            total_cents = order.total_cents,
            "Order created"
        );
        Ok(())
    }

    /// Gets an order header by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
        let order: Option<Order> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets an order header by its customer-facing tracking code.
    ///
    /// The code is normalized first (case, spaces, hyphens).
    pub async fn get_by_tracking_code(&self, code: &str) -> DbResult<Option<Order>> {
        let code = normalize_tracking_code(code);
        let sql = format!("SELECT {} FROM orders WHERE tracking_code = ?1", ORDER_COLUMNS);
        let order: Option<Order> = sqlx::query_as(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// The drinks of an order, in cart order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, drink_id, drink_name_snapshot, size_name_snapshot, size_ml,
                   quantity, unit_price_cents, line_total_cents, nutrition, nutrition_complete
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    /// The ingredient lines of one ordered drink, base lines first.
    pub async fn item_ingredients(&self, order_item_id: &str) -> DbResult<Vec<OrderItemIngredient>> {
        let rows: Vec<OrderItemIngredientRow> = sqlx::query_as(
            r#"
            SELECT id, order_item_id, ingredient_id, ingredient_name_snapshot,
                   amount, unit, role, grams, price_cents
            FROM order_item_ingredients
            WHERE order_item_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItemIngredient::from).collect())
    }

    /// Loads the drinks and ingredient lines of `order`.
    pub async fn details(&self, order: Order) -> DbResult<OrderDetails> {
        let items = self.items(&order.id).await?;
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let ingredients = self.item_ingredients(&item.id).await?;
            lines.push(OrderLine { item, ingredients });
        }

        Ok(OrderDetails { order, lines })
    }

    /// Moves an order from `expected` to `desired` (compare-and-set).
    ///
    /// ## Errors
    /// - `NotFound` when no order has `order_id`
    /// - `Transition(Conflict)` when the persisted status isn't `expected`,
    ///   including when another writer wins the race between read and write
    /// - `Transition(InvalidTransition)` when the move isn't allowed
    ///
    /// ## Returns
    /// The updated order header, read back by the same statement that
    /// wrote it.
    pub async fn update_status(
        &self,
        order_id: &str,
        expected: OrderStatus,
        desired: OrderStatus,
    ) -> DbResult<Order> {
        let persisted = self.current_status(order_id).await?;
        check_transition(persisted, expected, desired)?;

        let now = Utc::now();
        let sql = format!(
            "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2 \
             RETURNING {}",
            ORDER_COLUMNS
        );
        let updated: Option<Order> = sqlx::query_as(&sql)
            .bind(order_id)
            .bind(expected)
            .bind(desired)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        let Some(order) = updated else {
            // Someone else moved it between our read and write
            let actual = self.current_status(order_id).await?;
            return Err(TransitionError::Conflict { expected, actual }.into());
        };

        info!(
            order_id,
            from = %expected,
            to = %desired,
            "Order status updated"
        );

        Ok(order)
    }

    /// Orders in `status`, earliest pickup first (the bar's queue).
    pub async fn list_by_status(&self, status: OrderStatus, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE status = ?1 ORDER BY pickup_at, created_at LIMIT ?2",
            ORDER_COLUMNS
        );
        let orders: Vec<Order> = sqlx::query_as(&sql)
            .bind(status)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    async fn current_status(&self, order_id: &str) -> DbResult<OrderStatus> {
        let status: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        status.ok_or_else(|| DbError::not_found("Order", order_id))
    }
}

async fn insert_header(tx: &mut Transaction<'_, Sqlite>, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, tracking_code, status, customer_id,
            contact_name, contact_phone, contact_email,
            pickup_at, payment_method, payment_reference,
            subtotal_cents, discount_cents, total_cents,
            promotion_id, promotion_code, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7,
            ?8, ?9, ?10,
            ?11, ?12, ?13,
            ?14, ?15, ?16, ?17
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.tracking_code)
    .bind(order.status)
    .bind(&order.customer_id)
    .bind(&order.contact_name)
    .bind(&order.contact_phone)
    .bind(&order.contact_email)
    .bind(order.pickup_at)
    .bind(order.payment_method)
    .bind(&order.payment_reference)
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.total_cents)
    .bind(&order.promotion_id)
    .bind(&order.promotion_code)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } if field == "tracking_code" => {
            DbError::duplicate("tracking_code", order.tracking_code.clone())
        }
        other => other,
    })?;

    Ok(())
}

/// Refuses the redemption when the customer already used the promotion
/// `max_uses_per_customer` times.
async fn check_redemption_limit(
    tx: &mut Transaction<'_, Sqlite>,
    order: &Order,
    promotion_id: &str,
    customer_id: &str,
) -> DbResult<()> {
    let limit: Option<Option<i64>> =
        sqlx::query_scalar("SELECT max_uses_per_customer FROM promotions WHERE id = ?1")
            .bind(promotion_id)
            .fetch_optional(&mut **tx)
            .await?;
    let Some(limit) = limit.flatten() else {
        return Ok(());
    };

    let used: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM promotion_redemptions WHERE promotion_id = ?1 AND customer_id = ?2",
    )
    .bind(promotion_id)
    .bind(customer_id)
    .fetch_one(&mut **tx)
    .await?;

    if used >= limit {
        warn!(
            order_id = %order.id,
            promotion_id,
            customer_id,
            used,
            limit,
            "Promotion usage cap reached at commit"
        );
        return Err(DbError::RedemptionLimit {
            code: order
                .promotion_code
                .clone()
                .unwrap_or_else(|| promotion_id.to_string()),
            limit: u32::try_from(limit).unwrap_or(0),
        });
    }

    Ok(())
}

async fn insert_item(
    tx: &mut Transaction<'_, Sqlite>,
    item: &OrderItem,
    position: i64,
) -> DbResult<()> {
    let nutrition = serde_json::to_string(&item.nutrition)
        .map_err(|e| DbError::invalid_data("order item nutrition", e))?;

    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, drink_id, drink_name_snapshot, size_name_snapshot, size_ml,
            quantity, unit_price_cents, line_total_cents, nutrition, nutrition_complete, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.drink_id)
    .bind(&item.drink_name_snapshot)
    .bind(&item.size_name_snapshot)
    .bind(item.size_ml)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.line_total_cents)
    .bind(nutrition)
    .bind(item.nutrition_complete)
    .bind(position)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_item_ingredient(
    tx: &mut Transaction<'_, Sqlite>,
    line: &OrderItemIngredient,
    position: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_item_ingredients (
            id, order_item_id, ingredient_id, ingredient_name_snapshot,
            amount, unit, role, grams, price_cents, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&line.id)
    .bind(&line.order_item_id)
    .bind(&line.ingredient_id)
    .bind(&line.ingredient_name_snapshot)
    .bind(line.amount)
    .bind(line.unit)
    .bind(line.role)
    .bind(line.grams)
    .bind(line.price_cents)
    .bind(position)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
