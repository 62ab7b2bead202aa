//! # Checkout
//!
//! Turns a session cart into a persisted order.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout(session, request)                      │
//! │                                                                         │
//! │  1. Validate   cart not empty, contact, pickup window, payment ref     │
//! │        │          └── any problem ──► { success: false, errors }        │
//! │        ▼                                                                │
//! │  2. Re-price   every item against the catalog as it is now              │
//! │        │          └── drink / size / add-on gone ──► errors             │
//! │        ▼                                                                │
//! │  3. Promotion  request code, else the session's code, validated and     │
//! │        │       applied to the re-priced cart                            │
//! │        │          └── no longer applies ──► errors (order not placed)   │
//! │        ▼                                                                │
//! │  4. Snapshot   names, sizes, grams, add-on prices, nutrition per item   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  5. Persist    one transaction (with retry); tracking code collision    │
//! │        │       → new code, try again; usage cap re-checked → errors     │
//! │        ▼                                                                │
//! │  6. Session cart removed ──► { success, order_id, tracking_code }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use brewline_core::fulfillment::generate_tracking_code;
use brewline_core::units::to_grams;
use brewline_core::validation::{validate_contact, validate_pickup_time, validate_promotion_code};
use brewline_core::{
    AddOnSelection, CartItem, CatalogSnapshot, Money, Order, OrderItem, OrderItemIngredient,
    OrderStatus, PaymentMethod, Promotion,
};
use brewline_db::{Database, DbError, NewOrder, OrderLine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commands::cart::price_item;
use crate::commands::promotion::{evaluate_code, CodeEvaluation};
use crate::config::AppConfig;
use crate::error::{ApiError, ErrorCode};
use crate::retry::{with_backoff, RetryPolicy};
use crate::state::{CartSession, SessionCarts};

/// Fresh tracking codes tried before giving up.
const MAX_TRACKING_ATTEMPTS: usize = 5;

/// Order details supplied at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Identified customer; anonymous orders skip usage caps.
    #[serde(default)]
    pub customer_id: Option<String>,

    pub contact_name: String,

    #[serde(default)]
    pub contact_phone: Option<String>,

    #[serde(default)]
    pub contact_email: Option<String>,

    pub pickup_at: DateTime<Utc>,

    pub payment_method: PaymentMethod,

    /// Processor reference; required for card and wallet.
    #[serde(default)]
    pub payment_reference: Option<String>,

    /// Overrides the code applied to the session.
    #[serde(default)]
    pub promotion_code: Option<String>,
}

/// Checkout outcome.
///
/// Problems the customer can fix come back as `success: false` with
/// `errors`; store failures are `Err(ApiError)`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: Option<String>,
    pub tracking_code: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub errors: Vec<String>,
}

impl CheckoutResponse {
    fn rejected(subtotal: Money, errors: Vec<String>) -> Self {
        CheckoutResponse {
            success: false,
            order_id: None,
            tracking_code: None,
            subtotal_cents: subtotal.cents(),
            discount_cents: 0,
            total_cents: subtotal.cents(),
            errors,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Checks everything that does not need the database.
fn validate_request(
    request: &CheckoutRequest,
    session: &CartSession,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut errors = Vec::new();

    if session.cart.is_empty() {
        errors.push("Cart is empty".to_string());
    }

    if let Err(e) = validate_contact(
        &request.contact_name,
        request.contact_phone.as_deref(),
        request.contact_email.as_deref(),
    ) {
        errors.push(e.to_string());
    }

    if validate_pickup_time(
        request.pickup_at,
        now,
        config.orders.min_pickup_lead_minutes,
        config.orders.max_pickup_ahead_hours,
    )
    .is_err()
    {
        errors.push(format!(
            "Pickup time must be between {} minutes and {} hours from now",
            config.orders.min_pickup_lead_minutes, config.orders.max_pickup_ahead_hours
        ));
    }

    let needs_reference = matches!(
        request.payment_method,
        PaymentMethod::Card | PaymentMethod::Wallet
    );
    if needs_reference && non_empty(&request.payment_reference).is_none() {
        errors.push("payment_reference is required for card and wallet payments".to_string());
    }

    errors
}

/// Catalog problems the customer resolves by editing the cart.
fn is_cart_problem(err: &ApiError) -> bool {
    matches!(
        err.code,
        ErrorCode::NotFound | ErrorCode::ValidationError | ErrorCode::CartError
    )
}

/// Snapshots one re-priced cart item for the order.
fn order_line(order_id: &str, item: &CartItem, snapshot: &CatalogSnapshot) -> OrderLine {
    let item_id = Uuid::new_v4().to_string();

    // recipe lines, extras included, are covered by the size price
    let recipe = item.recipe_lines().iter().map(|line| (line, 0));
    let add_ons = item
        .add_on_lines()
        .iter()
        .zip(item.add_ons.iter().map(|a| a.price_cents));

    let ingredients = recipe
        .chain(add_ons)
        .map(|(line, price_cents)| {
            let ingredient = snapshot.ingredient(&line.ingredient_id);

            OrderItemIngredient {
                id: Uuid::new_v4().to_string(),
                order_item_id: item_id.clone(),
                ingredient_id: line.ingredient_id.clone(),
                ingredient_name_snapshot: ingredient
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| line.ingredient_id.clone()),
                amount: line.amount,
                unit: line.unit,
                role: line.role,
                grams: ingredient
                    .map(|i| to_grams(line.amount, line.unit, i).value)
                    .unwrap_or(0.0),
                price_cents,
            }
        })
        .collect();

    let nutrition = item.line_nutrition();

    OrderLine {
        item: OrderItem {
            id: item_id,
            order_id: order_id.to_string(),
            drink_id: item.drink_id.clone(),
            drink_name_snapshot: item.drink_name.clone(),
            size_name_snapshot: item.size_name.clone(),
            size_ml: item.size_ml,
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            line_total_cents: item.line_total().cents(),
            nutrition: nutrition.totals,
            nutrition_complete: nutrition.complete,
        },
        ingredients,
    }
}

/// Persists `new_order`, drawing a fresh tracking code from `next_code`
/// for every attempt.
async fn place_order(
    db: &Database,
    policy: &RetryPolicy,
    mut new_order: NewOrder,
    mut next_code: impl FnMut() -> String,
) -> Result<NewOrder, ApiError> {
    let orders = db.orders();
    let orders = &orders;

    for attempt in 1..=MAX_TRACKING_ATTEMPTS {
        new_order.order.tracking_code = next_code();

        let pending = &new_order;
        let result = with_backoff(policy, "create_order", move || orders.create_order(pending)).await;

        match result {
            Ok(()) => return Ok(new_order),
            Err(DbError::UniqueViolation { field, value }) if field == "tracking_code" => {
                warn!(attempt, tracking_code = %value, "Tracking code collision, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::internal("Could not allocate a unique tracking code"))
}

/// Places the session's cart as an order.
pub async fn checkout(
    db: &Database,
    carts: &SessionCarts,
    config: &AppConfig,
    session_id: &str,
    request: CheckoutRequest,
) -> Result<CheckoutResponse, ApiError> {
    let now = Utc::now();
    let session = carts.with_cart(session_id, |s| s.clone());
    debug!(session_id, items = session.cart.item_count(), "checkout command");

    let errors = validate_request(&request, &session, config, now);
    if !errors.is_empty() {
        debug!(session_id, errors = ?errors, "Checkout rejected");
        return Ok(CheckoutResponse::rejected(session.cart.subtotal(), errors));
    }

    // Prices may have moved since the items went into the cart.
    let policy = config.retry_policy();
    let mut errors = Vec::new();
    let mut priced = Vec::with_capacity(session.cart.items.len());
    for item in &session.cart.items {
        let selections: Vec<AddOnSelection> = item
            .add_ons
            .iter()
            .map(|a| AddOnSelection {
                ingredient_id: a.ingredient_id.clone(),
                amount: a.amount,
                unit: a.unit,
                unit_label: a.unit_label.clone(),
            })
            .collect();

        match price_item(
            db,
            &policy,
            &item.drink_id,
            &item.size_id,
            &selections,
            item.quantity,
        )
        .await
        {
            Ok(priced_item) => priced.push(priced_item),
            Err(e) if is_cart_problem(&e) => {
                errors.push(format!("{} ({}): {}", item.drink_name, item.size_name, e.message));
            }
            Err(e) => return Err(e),
        }
    }
    if !errors.is_empty() {
        return Ok(CheckoutResponse::rejected(session.cart.subtotal(), errors));
    }

    let items: Vec<CartItem> = priced.iter().map(|(item, _)| item.clone()).collect();
    let subtotal: Money = items.iter().map(CartItem::line_total).sum();
    let customer_id = non_empty(&request.customer_id);

    let mut discount = Money::zero();
    let mut applied: Option<Promotion> = None;
    if let Some(code) = non_empty(&request.promotion_code).or(session.promotion_code.clone()) {
        let code = match validate_promotion_code(&code) {
            Ok(code) => code,
            Err(e) => return Ok(CheckoutResponse::rejected(subtotal, vec![e.to_string()])),
        };

        match evaluate_code(db, &policy, &code, &items, subtotal, customer_id.as_deref()).await? {
            CodeEvaluation::Applied { promotion, outcome } => {
                discount = Money::from_cents(outcome.discount_cents).clamp_to(subtotal);
                applied = Some(promotion);
            }
            CodeEvaluation::Rejected(promotion_errors) => {
                let errors = promotion_errors.iter().map(ToString::to_string).collect();
                return Ok(CheckoutResponse::rejected(subtotal, errors));
            }
        }
    }
    let total = subtotal.saturating_sub_floor(discount);

    let order_id = Uuid::new_v4().to_string();
    let lines = priced
        .iter()
        .map(|(item, snapshot)| order_line(&order_id, item, snapshot))
        .collect();

    let order = Order {
        id: order_id.clone(),
        tracking_code: String::new(),
        status: OrderStatus::Pending,
        customer_id,
        contact_name: request.contact_name.trim().to_string(),
        contact_phone: non_empty(&request.contact_phone),
        contact_email: non_empty(&request.contact_email),
        pickup_at: request.pickup_at,
        payment_method: request.payment_method,
        payment_reference: non_empty(&request.payment_reference),
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        total_cents: total.cents(),
        promotion_id: applied.as_ref().map(|p| p.id.clone()),
        promotion_code: applied.as_ref().map(|p| p.code.clone()),
        created_at: now,
        updated_at: now,
    };

    let length = config.orders.tracking_code_length;
    let placed = match place_order(db, &policy, NewOrder { order, lines }, || {
        generate_tracking_code(length)
    })
    .await
    {
        Ok(placed) => placed,
        // another checkout used up the customer's last redemption first
        Err(e) if e.code == ErrorCode::PromotionUsageExceeded => {
            debug!(session_id, error = %e.message, "Checkout rejected at commit");
            return Ok(CheckoutResponse::rejected(subtotal, vec![e.message]));
        }
        Err(e) => return Err(e),
    };

    carts.remove(session_id);

    info!(
        session_id,
        order_id = %placed.order.id,
        tracking_code = %placed.order.tracking_code,
        total = %config.format_money(total),
        "Order placed"
    );

    Ok(CheckoutResponse {
        success: true,
        order_id: Some(placed.order.id),
        tracking_code: Some(placed.order.tracking_code),
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        total_cents: total.cents(),
        errors: Vec::new(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, AddToCartRequest};
    use crate::commands::fixtures::{config, seeded_db, syrup, SESSION};
    use brewline_core::cart::build_cart_item;
    use brewline_core::{
        Drink, Ingredient, IngredientPricing, LineRole, MeasureUnit, PricingMode, RecipeLine,
        SizeVariant,
    };
    use chrono::Duration;

    pub(crate) fn request() -> CheckoutRequest {
        CheckoutRequest {
            customer_id: None,
            contact_name: "Sam".to_string(),
            contact_phone: Some("555-0100".to_string()),
            contact_email: None,
            pickup_at: Utc::now() + Duration::minutes(30),
            payment_method: PaymentMethod::PayAtPickup,
            payment_reference: None,
            promotion_code: None,
        }
    }

    pub(crate) async fn add_latte(db: &Database, carts: &SessionCarts, session: &str, pumps: f64) {
        let add_ons = if pumps > 0.0 { vec![syrup(pumps)] } else { vec![] };
        add_to_cart(
            db,
            carts,
            &config(),
            session,
            AddToCartRequest {
                drink_id: "latte".to_string(),
                size_id: "latte_regular".to_string(),
                add_ons,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_checkout_persists_order_and_clears_cart() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        add_latte(&db, &carts, SESSION, 2.0).await;

        let response = checkout(&db, &carts, &config(), SESSION, request())
            .await
            .unwrap();

        assert!(response.success, "{:?}", response.errors);
        assert_eq!(response.subtotal_cents, 1150);
        assert_eq!(response.total_cents, 1150);
        let code = response.tracking_code.unwrap();
        assert_eq!(code.len(), 8);
        assert_eq!(carts.session_count(), 0);

        let order = db.orders().get_by_tracking_code(&code).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.contact_name, "Sam");
        let details = db.orders().details(order).await.unwrap();
        assert_eq!(details.lines.len(), 1);

        let line = &details.lines[0];
        assert_eq!(line.item.quantity, 2);
        assert_eq!(line.item.line_total_cents, 1150);
        assert_eq!(line.ingredients.len(), 3);

        let extra = line
            .ingredients
            .iter()
            .find(|i| i.role == LineRole::Extra)
            .unwrap();
        assert_eq!(extra.ingredient_id, "vanilla_syrup");
        assert_eq!(extra.price_cents, 100);
        // 2 pieces × 10 g
        assert!((extra.grams - 20.0).abs() < 1e-9);

        let milk = line
            .ingredients
            .iter()
            .find(|i| i.ingredient_id == "milk")
            .unwrap();
        assert_eq!(milk.price_cents, 0);
        assert!((milk.grams - 270.0 * 1.03).abs() < 1e-6);
    }

    #[test]
    fn test_add_on_price_survives_recipe_extra_line() {
        let ingredient = |id: &str, add_on: bool| Ingredient {
            id: id.to_string(),
            name: id.to_string(),
            default_unit: MeasureUnit::Gram,
            grams_per_unit: Some(10.0),
            density_g_per_ml: Some(1.0),
            allergens: Default::default(),
            is_active: true,
            is_add_on: add_on,
        };
        let snapshot = CatalogSnapshot::from_rows(
            vec![
                ingredient("espresso", false),
                ingredient("cream", true),
                ingredient("vanilla", true),
            ],
            Vec::new(),
            vec![IngredientPricing {
                ingredient_id: "vanilla".to_string(),
                mode: PricingMode::Flat,
                base_price_cents: 60,
                rate_centicents: None,
                unit_label: None,
            }],
        );
        let drink = Drink {
            id: "con_panna".to_string(),
            name: "Espresso con Panna".to_string(),
            base_size_ml: 60.0,
            is_active: true,
        };
        let recipe = vec![
            RecipeLine::new("espresso", 30.0, MeasureUnit::Gram),
            RecipeLine::new("cream", 15.0, MeasureUnit::Gram).extra(),
        ];
        let size = SizeVariant {
            id: "con_panna_single".to_string(),
            drink_id: "con_panna".to_string(),
            name: "single".to_string(),
            size_ml: 60.0,
            price_cents: 350,
            override_lines: None,
        };
        let vanilla = AddOnSelection {
            ingredient_id: "vanilla".to_string(),
            amount: 1.0,
            unit: MeasureUnit::Piece,
            unit_label: None,
        };
        let item = build_cart_item(&drink, &recipe, &size, &[vanilla], &snapshot, 1).unwrap();

        let line = order_line("order-1", &item, &snapshot);
        let priced: Vec<(&str, LineRole, i64)> = line
            .ingredients
            .iter()
            .map(|i| (i.ingredient_id.as_str(), i.role, i.price_cents))
            .collect();
        assert_eq!(
            priced,
            vec![
                ("espresso", LineRole::Base, 0),
                ("cream", LineRole::Extra, 0),
                ("vanilla", LineRole::Extra, 60),
            ]
        );
        assert_eq!(line.item.unit_price_cents, 410);
    }

    #[tokio::test]
    async fn test_checkout_collects_validation_errors() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();

        let mut bad = request();
        bad.contact_phone = None;
        bad.pickup_at = Utc::now() - Duration::minutes(5);
        bad.payment_method = PaymentMethod::Card;

        let response = checkout(&db, &carts, &config(), SESSION, bad).await.unwrap();
        assert!(!response.success);
        assert!(response.order_id.is_none());
        // empty cart, contact, pickup, payment reference
        assert_eq!(response.errors.len(), 4, "{:?}", response.errors);
    }

    #[tokio::test]
    async fn test_checkout_applies_session_promotion_and_records_redemption() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();
        add_latte(&db, &carts, SESSION, 0.0).await;
        carts.with_cart_mut(SESSION, |s| s.promotion_code = Some("WELCOME10".into()));

        let mut req = request();
        req.customer_id = Some("cust-1".to_string());
        let response = checkout(&db, &carts, &cfg, SESSION, req.clone()).await.unwrap();

        assert!(response.success, "{:?}", response.errors);
        assert_eq!(response.subtotal_cents, 950);
        assert_eq!(response.discount_cents, 95);
        assert_eq!(response.total_cents, 855);
        assert_eq!(
            db.promotions()
                .redemption_count("promo_welcome", "cust-1")
                .await
                .unwrap(),
            1
        );

        // second use by the same customer is refused and nothing is placed
        add_latte(&db, &carts, SESSION, 0.0).await;
        let mut again = req;
        again.promotion_code = Some("welcome10".to_string());
        let response = checkout(&db, &carts, &cfg, SESSION, again).await.unwrap();
        assert!(!response.success);
        assert!(response.errors[0].contains("1 time(s)"));
        assert_eq!(carts.with_cart(SESSION, |s| s.cart.item_count()), 1);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_redeem_capped_code_once() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();
        for session in ["phone", "laptop"] {
            add_latte(&db, &carts, session, 0.0).await;
        }

        let mut req = request();
        req.customer_id = Some("cust-1".to_string());
        req.promotion_code = Some("WELCOME10".to_string());

        let (a, b) = tokio::join!(
            checkout(&db, &carts, &cfg, "phone", req.clone()),
            checkout(&db, &carts, &cfg, "laptop", req.clone()),
        );
        let responses = [a.unwrap(), b.unwrap()];

        let placed: Vec<_> = responses.iter().filter(|r| r.success).collect();
        let refused: Vec<_> = responses.iter().filter(|r| !r.success).collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(refused.len(), 1);
        assert!(refused[0].errors[0].contains("1 time(s)"), "{:?}", refused[0].errors);
        assert_eq!(
            db.promotions()
                .redemption_count("promo_welcome", "cust-1")
                .await
                .unwrap(),
            1
        );
        // the refused session keeps its cart
        assert_eq!(carts.session_count(), 1);
    }

    #[tokio::test]
    async fn test_usage_cap_reached_after_pricing_refuses_order() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();
        add_latte(&db, &carts, SESSION, 0.0).await;

        let mut req = request();
        req.customer_id = Some("cust-1".to_string());
        req.promotion_code = Some("WELCOME10".to_string());
        let first = checkout(&db, &carts, &cfg, SESSION, req).await.unwrap();
        let placed = db
            .orders()
            .get_by_tracking_code(&first.tracking_code.unwrap())
            .await
            .unwrap()
            .unwrap();

        // an order priced before the first one committed
        let mut late = placed.clone();
        late.id = Uuid::new_v4().to_string();
        let err = place_order(
            &db,
            &cfg.retry_policy(),
            NewOrder {
                order: late,
                lines: Vec::new(),
            },
            || "QQQQ7777".to_string(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::PromotionUsageExceeded);
        assert!(db
            .orders()
            .get_by_tracking_code("QQQQ7777")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_anonymous_checkout_skips_usage_cap() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();

        for _ in 0..2 {
            add_latte(&db, &carts, SESSION, 0.0).await;
            let mut req = request();
            req.promotion_code = Some("WELCOME10".to_string());
            let response = checkout(&db, &carts, &cfg, SESSION, req).await.unwrap();
            assert!(response.success, "{:?}", response.errors);
            assert_eq!(response.discount_cents, 95);
        }
    }

    #[tokio::test]
    async fn test_checkout_rejects_item_whose_add_on_was_withdrawn() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        add_latte(&db, &carts, SESSION, 1.0).await;

        db.catalog()
            .set_ingredient_active("vanilla_syrup", false)
            .await
            .unwrap();

        let response = checkout(&db, &carts, &config(), SESSION, request())
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.errors[0].starts_with("Caffè Latte"));
        assert_eq!(carts.session_count(), 1);
    }

    #[tokio::test]
    async fn test_tracking_code_collision_regenerates() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        add_latte(&db, &carts, SESSION, 0.0).await;
        let first = checkout(&db, &carts, &config(), SESSION, request())
            .await
            .unwrap();
        let taken = first.tracking_code.unwrap();

        // a second order that first draws the taken code
        let existing = db.orders().get_by_tracking_code(&taken).await.unwrap().unwrap();
        let details = db.orders().details(existing).await.unwrap();
        let mut order = details.order.clone();
        order.id = Uuid::new_v4().to_string();
        let new_order = NewOrder {
            order,
            lines: Vec::new(),
        };

        let mut codes = vec!["ZZZZ2222".to_string(), taken.clone()];
        let placed = place_order(&db, &config().retry_policy(), new_order, || {
            codes.pop().unwrap_or_default()
        })
        .await
        .unwrap();

        assert_eq!(placed.order.tracking_code, "ZZZZ2222");
        assert!(db
            .orders()
            .get_by_tracking_code("ZZZZ2222")
            .await
            .unwrap()
            .is_some());
    }
}
