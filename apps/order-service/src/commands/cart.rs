//! # Cart Commands
//!
//! Session cart manipulation.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│  Code    │────►│  Order   │       │
//! │  │  Cart    │     │          │     │ applied  │     │ placed   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                              │
//! │                   add_to_cart      apply_promotion    checkout          │
//! │                   update_item      (promotion.rs)    (checkout.rs)      │
//! │                   remove_item                                           │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_cart ──────────────────────►                   │
//! │                                                      (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use brewline_core::cart::build_cart_item;
use brewline_core::validation::validate_quantity;
use brewline_core::{
    AddOnSelection, CartItem, CartSummary, CatalogSnapshot, Drink, RecipeLine, SizeVariant,
};
use brewline_db::{Database, DbError, DbResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::retry::{with_backoff, RetryPolicy};
use crate::state::{CartSession, SessionCarts};

/// Cart response including items, totals and nutrition.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
    pub promotion_code: Option<String>,
}

impl From<&CartSession> for CartResponse {
    fn from(session: &CartSession) -> Self {
        CartResponse {
            items: session.cart.items.clone(),
            summary: session.cart.summary(),
            promotion_code: session.promotion_code.clone(),
        }
    }
}

/// A drink in a size, with add-ons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub drink_id: String,
    pub size_id: String,

    #[serde(default)]
    pub add_ons: Vec<AddOnSelection>,

    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

// =============================================================================
// Pricing a drink
// =============================================================================

/// Everything needed to price one drink configuration.
pub(crate) struct ItemInputs {
    pub drink: Drink,
    pub base_lines: Vec<RecipeLine>,
    pub size: SizeVariant,
    pub snapshot: CatalogSnapshot,
}

async fn load_inputs(
    db: &Database,
    drink_id: &str,
    size_id: &str,
    add_on_ids: &[String],
) -> DbResult<ItemInputs> {
    let catalog = db.catalog();

    let drink = catalog
        .get_drink(drink_id)
        .await?
        .ok_or_else(|| DbError::not_found("Drink", drink_id))?;
    let size = catalog
        .get_size(drink_id, size_id)
        .await?
        .ok_or_else(|| DbError::not_found("Size", size_id))?;
    let base_lines = catalog.base_lines(drink_id).await?;

    let mut ids: Vec<String> = base_lines.iter().map(|l| l.ingredient_id.clone()).collect();
    if let Some(lines) = &size.override_lines {
        ids.extend(lines.iter().map(|l| l.ingredient_id.clone()));
    }
    ids.extend(add_on_ids.iter().cloned());
    let snapshot = catalog.load_snapshot(&ids).await?;

    Ok(ItemInputs {
        drink,
        base_lines,
        size,
        snapshot,
    })
}

/// Prices a drink configuration against the current catalog.
///
/// Returns the snapshot too, so checkout can snapshot ingredient names and
/// weights from the same catalog state it priced against.
pub(crate) async fn price_item(
    db: &Database,
    policy: &RetryPolicy,
    drink_id: &str,
    size_id: &str,
    add_ons: &[AddOnSelection],
    quantity: i64,
) -> Result<(CartItem, CatalogSnapshot), ApiError> {
    let add_on_ids: Vec<String> = add_ons.iter().map(|a| a.ingredient_id.clone()).collect();
    let add_on_ids = &add_on_ids;

    let inputs = with_backoff(policy, "load_item_inputs", move || {
        load_inputs(db, drink_id, size_id, add_on_ids)
    })
    .await?;

    let item = build_cart_item(
        &inputs.drink,
        &inputs.base_lines,
        &inputs.size,
        add_ons,
        &inputs.snapshot,
        quantity,
    )?;
    Ok((item, inputs.snapshot))
}

// =============================================================================
// Commands
// =============================================================================

/// Gets a session's cart.
pub fn get_cart(carts: &SessionCarts, session_id: &str) -> CartResponse {
    debug!(session_id, "get_cart command");
    carts.with_cart(session_id, |session| CartResponse::from(session))
}

/// Adds a drink in a size, with add-ons, to a session's cart.
///
/// ## Behavior
/// - Priced from the catalog now; the price is frozen on the cart item
/// - Same drink, size and add-ons as an existing item: quantities merge
/// - Unknown drink or size: `NOT_FOUND`
/// - Add-on that is inactive or not sold as an add-on: `VALIDATION_ERROR`
pub async fn add_to_cart(
    db: &Database,
    carts: &SessionCarts,
    config: &AppConfig,
    session_id: &str,
    request: AddToCartRequest,
) -> Result<CartResponse, ApiError> {
    debug!(
        session_id,
        drink_id = %request.drink_id,
        size_id = %request.size_id,
        add_ons = request.add_ons.len(),
        quantity = request.quantity,
        "add_to_cart command"
    );
    validate_quantity(request.quantity)?;

    let (item, _) = price_item(
        db,
        &config.retry_policy(),
        &request.drink_id,
        &request.size_id,
        &request.add_ons,
        request.quantity,
    )
    .await?;

    carts.with_cart_mut(session_id, |session| -> Result<CartResponse, ApiError> {
        session.cart.add_item(item)?;
        Ok(CartResponse::from(&*session))
    })
}

/// Sets an item's quantity. Zero removes the item.
pub fn update_cart_item(
    carts: &SessionCarts,
    session_id: &str,
    item_id: &str,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(session_id, item_id, quantity, "update_cart_item command");

    if quantity < 0 {
        return Err(ApiError::validation("Quantity cannot be negative"));
    }

    carts.with_cart_mut(session_id, |session| -> Result<CartResponse, ApiError> {
        session.cart.update_quantity(item_id, quantity)?;
        Ok(CartResponse::from(&*session))
    })
}

/// Removes an item from the cart.
pub fn remove_from_cart(
    carts: &SessionCarts,
    session_id: &str,
    item_id: &str,
) -> Result<CartResponse, ApiError> {
    debug!(session_id, item_id, "remove_from_cart command");

    carts.with_cart_mut(session_id, |session| -> Result<CartResponse, ApiError> {
        session.cart.remove_item(item_id)?;
        Ok(CartResponse::from(&*session))
    })
}

/// Empties the cart and drops any applied code.
pub fn clear_cart(carts: &SessionCarts, session_id: &str) -> CartResponse {
    debug!(session_id, "clear_cart command");

    carts.with_cart_mut(session_id, |session| {
        session.cart.clear();
        session.promotion_code = None;
        CartResponse::from(&*session)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{config, seeded_db, syrup, SESSION};
    use crate::error::ErrorCode;
    use brewline_core::MeasureUnit;

    fn latte(size: &str, add_ons: Vec<AddOnSelection>, quantity: i64) -> AddToCartRequest {
        AddToCartRequest {
            drink_id: "latte".to_string(),
            size_id: format!("latte_{}", size),
            add_ons,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_add_prices_size_plus_add_ons() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();

        let cart = add_to_cart(&db, &carts, &config(), SESSION, latte("regular", vec![syrup(2.0)], 2))
            .await
            .unwrap();

        assert_eq!(cart.items.len(), 1);
        let item = &cart.items[0];
        // $4.75 size + 2 pumps × 50¢
        assert_eq!(item.unit_price_cents, 575);
        assert_eq!(item.add_ons[0].price_cents, 100);
        assert_eq!(cart.summary.subtotal_cents, 1150);
        assert!(cart.summary.pricing_exact);
        assert!(item.nutrition.complete);
    }

    #[tokio::test]
    async fn test_large_size_scales_recipe() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();

        let cart = add_to_cart(&db, &carts, &config(), SESSION, latte("large", vec![], 1))
            .await
            .unwrap();

        let milk = cart.items[0]
            .lines
            .iter()
            .find(|l| l.ingredient_id == "milk")
            .unwrap();
        // 270 ml × 470/350
        assert!((milk.amount - 362.6).abs() < 0.05);
        assert_eq!(cart.items[0].unit_price_cents, 575);
    }

    #[tokio::test]
    async fn test_same_configuration_merges() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();

        add_to_cart(&db, &carts, &cfg, SESSION, latte("regular", vec![syrup(1.0)], 1))
            .await
            .unwrap();
        let cart = add_to_cart(&db, &carts, &cfg, SESSION, latte("regular", vec![syrup(1.0)], 2))
            .await
            .unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);

        let cart = add_to_cart(&db, &carts, &cfg, SESSION, latte("large", vec![], 1))
            .await
            .unwrap();
        assert_eq!(cart.items.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_nutrition_flags_item_incomplete() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cream = AddOnSelection {
            ingredient_id: "whipped_cream".to_string(),
            amount: 15.0,
            unit: MeasureUnit::Gram,
            unit_label: None,
        };

        let cart = add_to_cart(&db, &carts, &config(), SESSION, latte("regular", vec![cream], 1))
            .await
            .unwrap();

        let item = &cart.items[0];
        assert_eq!(item.unit_price_cents, 475 + 75);
        assert!(!item.nutrition.complete);
        assert!(!cart.summary.nutrition.complete);
        // the rest of the drink still counts
        assert!(item.nutrition.totals.energy_kcal > 0.0);
    }

    #[tokio::test]
    async fn test_unknown_drink_size_and_add_on() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();

        let mut request = latte("regular", vec![], 1);
        request.drink_id = "frappe".to_string();
        let err = add_to_cart(&db, &carts, &cfg, SESSION, request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = add_to_cart(&db, &carts, &cfg, SESSION, latte("venti", vec![], 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let not_add_on = AddOnSelection {
            ingredient_id: "milk".to_string(),
            amount: 30.0,
            unit: MeasureUnit::Milliliter,
            unit_label: None,
        };
        let err = add_to_cart(&db, &carts, &cfg, SESSION, latte("regular", vec![not_add_on], 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        assert!(get_cart(&carts, SESSION).items.is_empty());
    }

    #[tokio::test]
    async fn test_quantity_limits() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();

        let err = add_to_cart(&db, &carts, &cfg, SESSION, latte("regular", vec![], 0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        add_to_cart(&db, &carts, &cfg, SESSION, latte("regular", vec![], 90))
            .await
            .unwrap();
        let err = add_to_cart(&db, &carts, &cfg, SESSION, latte("regular", vec![], 10))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_update_remove_and_clear() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();

        let cart = add_to_cart(&db, &carts, &config(), SESSION, latte("regular", vec![], 1))
            .await
            .unwrap();
        let item_id = cart.items[0].id.clone();

        let cart = update_cart_item(&carts, SESSION, &item_id, 4).unwrap();
        assert_eq!(cart.summary.total_quantity, 4);
        assert_eq!(cart.summary.subtotal_cents, 1900);

        assert!(update_cart_item(&carts, SESSION, &item_id, -1).is_err());
        let err = remove_from_cart(&carts, SESSION, "missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let cart = update_cart_item(&carts, SESSION, &item_id, 0).unwrap();
        assert!(cart.items.is_empty());

        carts.with_cart_mut(SESSION, |s| s.promotion_code = Some("WELCOME10".into()));
        let cart = clear_cart(&carts, SESSION);
        assert!(cart.items.is_empty());
        assert_eq!(cart.promotion_code, None);
    }
}
