//! # Order Tracking
//!
//! Customer-facing lookup by tracking code.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Order K7M2-X9PQ                      READY             │
//! │  Pickup 08:45 · Sam                                     │
//! ├─────────────────────────────────────────────────────────┤
//! │  2 × Caffè Latte (regular)                    $11.50    │
//! │      espresso 60 ml · whole milk 270 ml                 │
//! │      + vanilla syrup 2 pump                  +$1.00     │
//! │      380 kcal · 24 g sugar                              │
//! ├─────────────────────────────────────────────────────────┤
//! │  Subtotal $11.50 · Discount $1.15 · Total $10.35        │
//! └─────────────────────────────────────────────────────────┘
//! ```

use brewline_core::validation::validate_tracking_code;
use brewline_core::{LineRole, Macros, MeasureUnit, OrderItemIngredient, OrderStatus};
use brewline_db::{Database, OrderLine};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::retry::with_backoff;

/// An ingredient line as ordered.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedLine {
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: MeasureUnit,
    pub grams: f64,
    pub price_cents: i64,
}

impl From<&OrderItemIngredient> for TrackedLine {
    fn from(line: &OrderItemIngredient) -> Self {
        TrackedLine {
            ingredient_name: line.ingredient_name_snapshot.clone(),
            amount: line.amount,
            unit: line.unit,
            grams: line.grams,
            price_cents: line.price_cents,
        }
    }
}

/// One ordered drink.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedItem {
    pub drink_name: String,
    pub size_name: String,
    pub size_ml: f64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,

    /// Recipe as made for this size.
    pub base_lines: Vec<TrackedLine>,

    /// Add-ons, each with the price charged per drink.
    pub extra_lines: Vec<TrackedLine>,

    /// Totals for the whole line (all units).
    pub nutrition: Macros,
    pub nutrition_complete: bool,
}

impl From<&OrderLine> for TrackedItem {
    fn from(line: &OrderLine) -> Self {
        let (extras, base): (Vec<_>, Vec<_>) = line
            .ingredients
            .iter()
            .partition(|i| i.role == LineRole::Extra);

        TrackedItem {
            drink_name: line.item.drink_name_snapshot.clone(),
            size_name: line.item.size_name_snapshot.clone(),
            size_ml: line.item.size_ml,
            quantity: line.item.quantity,
            unit_price_cents: line.item.unit_price_cents,
            line_total_cents: line.item.line_total_cents,
            base_lines: base.into_iter().map(TrackedLine::from).collect(),
            extra_lines: extras.into_iter().map(TrackedLine::from).collect(),
            nutrition: line.item.nutrition,
            nutrition_complete: line.item.nutrition_complete,
        }
    }
}

/// What the customer sees for a tracking code.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedOrder {
    pub tracking_code: String,
    pub status: OrderStatus,

    /// Where the order can go next; empty once picked up or cancelled.
    pub next_statuses: Vec<OrderStatus>,

    pub contact_name: String,
    pub pickup_at: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub promotion_code: Option<String>,
    pub items: Vec<TrackedItem>,

    /// Sum over all items.
    pub nutrition: Macros,

    /// False if any item's nutrition is an estimate.
    pub nutrition_complete: bool,
}

/// Looks up an order by tracking code.
///
/// Codes are matched case-insensitively and ignore separators, so
/// `k7m2-x9pq` finds `K7M2X9PQ`.
pub async fn track_order(
    db: &Database,
    config: &AppConfig,
    tracking_code: &str,
) -> Result<TrackedOrder, ApiError> {
    let code = validate_tracking_code(tracking_code)?;
    debug!(tracking_code = %code, "track_order command");

    let policy = config.retry_policy();
    let orders = db.orders();
    let orders = &orders;

    let code_ref = code.as_str();
    let order = with_backoff(&policy, "get_order_by_tracking_code", move || {
        orders.get_by_tracking_code(code_ref)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Order", &code))?;

    let order = &order;
    let details = with_backoff(&policy, "order_details", move || orders.details(order.clone()))
        .await?;

    let items: Vec<TrackedItem> = details.lines.iter().map(TrackedItem::from).collect();
    let nutrition = items
        .iter()
        .fold(Macros::default(), |acc, item| acc + item.nutrition);
    let nutrition_complete = items.iter().all(|item| item.nutrition_complete);

    let order = details.order;
    Ok(TrackedOrder {
        tracking_code: order.tracking_code,
        status: order.status,
        next_statuses: order.status.next_statuses(),
        contact_name: order.contact_name,
        pickup_at: order.pickup_at,
        subtotal_cents: order.subtotal_cents,
        discount_cents: order.discount_cents,
        total_cents: order.total_cents,
        promotion_code: order.promotion_code,
        items,
        nutrition,
        nutrition_complete,
    })
}
