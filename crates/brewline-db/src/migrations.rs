//! # Schema Migrations
//!
//! The schema lives in `migrations/sqlite/` at the workspace root and is
//! compiled into the crate with `sqlx::migrate!`.
//!
//! ```text
//! 001_initial_schema.sql
//!   catalog      ingredients, ingredient_nutrition, ingredient_pricing,
//!                drinks, size_variants, recipe_lines
//!   promotions   promotions, promotion_redemptions
//!   orders       orders, order_items, order_item_ingredients
//! ```
//!
//! New schema goes in a new `NNN_description.sql` file. Applied files are
//! checksummed by sqlx, so editing one breaks every existing database.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Tables every repository expects to find.
pub const REQUIRED_TABLES: &[&str] = &[
    "ingredients",
    "ingredient_nutrition",
    "ingredient_pricing",
    "drinks",
    "size_variants",
    "recipe_lines",
    "promotions",
    "promotion_redemptions",
    "orders",
    "order_items",
    "order_item_ingredients",
];

/// How far a database is behind the embedded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }

    pub fn is_current(&self) -> bool {
        self.pending() == 0
    }
}

/// Applies every embedded migration not yet recorded in the database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await?;
    if before.is_current() {
        info!(applied = before.applied, "Schema up to date");
        return Ok(());
    }

    info!(pending = before.pending(), "Applying schema migrations");
    MIGRATOR.run(pool).await?;

    let missing = missing_tables(pool).await?;
    if !missing.is_empty() {
        warn!(?missing, "Migrations ran but tables are missing");
    }
    Ok(())
}

/// Embedded versus applied migration counts.
///
/// A database that has never been migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table == 0 {
        0
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    };

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or(0),
    })
}

/// Entries of [`REQUIRED_TABLES`] absent from the database.
pub async fn missing_tables(pool: &SqlitePool) -> DbResult<Vec<&'static str>> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;

    Ok(REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !present.iter().any(|p| p == table))
        .collect())
}
