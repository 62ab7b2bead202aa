//! # Promotion Commands
//!
//! Applying a promotion code to a session cart.
//!
//! ```text
//! apply_promotion("welcome10")
//!      │
//!      ▼
//! normalize ── bad format ──► VALIDATION_ERROR
//!      │
//!      ▼
//! find_by_code ──► every record sharing the code (active or not)
//!      │
//!      ▼
//! redemption counts (identified customers only)
//!      │
//!      ▼
//! engine::validate ── rejected ──► { valid: false, errors: [expired] }
//!      │
//!      ▼
//! engine::apply ──► { valid: true, discount, total }, code kept on session
//! ```
//!
//! The code is only remembered here; checkout evaluates it again against
//! the cart it actually places.

use std::collections::HashMap;

use brewline_core::promotion as engine;
use brewline_core::validation::validate_promotion_code;
use brewline_core::{CartItem, CoreError, Money, Promotion, PromotionError, PromotionOutcome};
use brewline_db::Database;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::commands::cart::CartResponse;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::retry::{with_backoff, RetryPolicy};
use crate::state::SessionCarts;

/// Result of applying a code.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionResponse {
    pub valid: bool,
    pub code: String,
    pub promotion_name: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,

    /// Why the code does not apply, tagged by kind.
    pub errors: Vec<PromotionError>,
}

/// Outcome of evaluating one code against one cart.
pub(crate) enum CodeEvaluation {
    Applied {
        promotion: Promotion,
        outcome: PromotionOutcome,
    },
    Rejected(Vec<PromotionError>),
}

/// Looks up `code` and runs it through the engine.
///
/// Store failures are `Err`; a code that does not apply is
/// `Ok(Rejected(..))`.
pub(crate) async fn evaluate_code(
    db: &Database,
    policy: &RetryPolicy,
    code: &str,
    items: &[CartItem],
    subtotal: Money,
    customer_id: Option<&str>,
) -> Result<CodeEvaluation, ApiError> {
    let promotions = db.promotions();
    let promotions = &promotions;

    let candidates = with_backoff(policy, "find_promotion", move || {
        promotions.find_by_code(code)
    })
    .await?;

    let usage = match customer_id {
        Some(customer) if !candidates.is_empty() => {
            let candidates = &candidates;
            with_backoff(policy, "redemption_counts", move || {
                promotions.redemption_counts(customer, candidates)
            })
            .await?
        }
        _ => HashMap::new(),
    };

    let validation = engine::validate(
        code,
        &candidates,
        items,
        subtotal,
        customer_id,
        &usage,
        Utc::now(),
    );

    let Some(promotion) = validation.promotion else {
        return Ok(CodeEvaluation::Rejected(validation.error.into_iter().collect()));
    };

    let outcome = engine::apply(&promotion, items, subtotal);
    if !outcome.success {
        return Ok(CodeEvaluation::Rejected(outcome.errors));
    }

    Ok(CodeEvaluation::Applied { promotion, outcome })
}

/// Applies a promotion code to a session's cart.
///
/// ## Behavior
/// - Valid: the normalized code is kept on the session for checkout
/// - Rejected: the response carries the reason; the session keeps whatever
///   code it had before
/// - Empty cart: `CART_ERROR`
pub async fn apply_promotion(
    db: &Database,
    carts: &SessionCarts,
    config: &AppConfig,
    session_id: &str,
    code: &str,
    customer_id: Option<&str>,
) -> Result<PromotionResponse, ApiError> {
    let code = validate_promotion_code(code)?;
    debug!(session_id, code = %code, "apply_promotion command");

    let (items, subtotal) =
        carts.with_cart(session_id, |s| (s.cart.items.clone(), s.cart.subtotal()));
    if items.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    let evaluation = evaluate_code(
        db,
        &config.retry_policy(),
        &code,
        &items,
        subtotal,
        customer_id,
    )
    .await?;

    match evaluation {
        CodeEvaluation::Applied { promotion, outcome } => {
            info!(
                session_id,
                code = %code,
                promotion_id = %promotion.id,
                discount_cents = outcome.discount_cents,
                "Promotion applied to cart"
            );
            carts.with_cart_mut(session_id, |s| s.promotion_code = Some(code.clone()));

            Ok(PromotionResponse {
                valid: true,
                code,
                promotion_name: Some(promotion.name),
                subtotal_cents: subtotal.cents(),
                discount_cents: outcome.discount_cents,
                total_cents: outcome.new_subtotal_cents,
                errors: Vec::new(),
            })
        }
        CodeEvaluation::Rejected(errors) => {
            debug!(session_id, code = %code, errors = errors.len(), "Promotion rejected");

            Ok(PromotionResponse {
                valid: false,
                code,
                promotion_name: None,
                subtotal_cents: subtotal.cents(),
                discount_cents: 0,
                total_cents: subtotal.cents(),
                errors,
            })
        }
    }
}

/// Drops the session's promotion code.
pub fn remove_promotion(carts: &SessionCarts, session_id: &str) -> CartResponse {
    debug!(session_id, "remove_promotion command");

    carts.with_cart_mut(session_id, |session| {
        session.promotion_code = None;
        CartResponse::from(&*session)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::{add_to_cart, AddToCartRequest};
    use crate::commands::fixtures::{config, seeded_db, SESSION};
    use crate::error::ErrorCode;

    async fn add(db: &Database, carts: &SessionCarts, drink: &str) {
        let request = AddToCartRequest {
            drink_id: drink.to_string(),
            size_id: format!("{}_regular", drink),
            add_ons: vec![],
            quantity: 1,
        };
        add_to_cart(db, carts, &config(), SESSION, request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_percentage_code_applies_and_sticks() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        add(&db, &carts, "latte").await;

        let response = apply_promotion(&db, &carts, &config(), SESSION, " welcome10 ", None)
            .await
            .unwrap();

        assert!(response.valid);
        assert_eq!(response.code, "WELCOME10");
        assert_eq!(response.subtotal_cents, 475);
        // 10% of 475 rounds half up
        assert_eq!(response.discount_cents, 48);
        assert_eq!(response.total_cents, 427);
        assert_eq!(
            carts.with_cart(SESSION, |s| s.promotion_code.clone()),
            Some("WELCOME10".to_string())
        );
    }

    #[tokio::test]
    async fn test_bundle_code() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        add(&db, &carts, "latte").await;
        add(&db, &carts, "americano").await;

        let response = apply_promotion(&db, &carts, &config(), SESSION, "DUO", None)
            .await
            .unwrap();

        assert!(response.valid);
        assert_eq!(response.subtotal_cents, 820);
        assert_eq!(response.discount_cents, 120);
        assert_eq!(response.total_cents, 700);
    }

    #[tokio::test]
    async fn test_rejections_carry_kind_and_keep_previous_code() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        let cfg = config();
        add(&db, &carts, "latte").await;

        apply_promotion(&db, &carts, &cfg, SESSION, "WELCOME10", None)
            .await
            .unwrap();

        let expired = apply_promotion(&db, &carts, &cfg, SESSION, "OLDNEWS", None)
            .await
            .unwrap();
        assert!(!expired.valid);
        assert_eq!(expired.discount_cents, 0);
        assert_eq!(expired.total_cents, 475);
        assert_eq!(expired.errors[0].kind(), "expired");

        let threshold = apply_promotion(&db, &carts, &cfg, SESSION, "FIVEOFF", None)
            .await
            .unwrap();
        assert_eq!(threshold.errors[0].kind(), "threshold_not_met");

        let unknown = apply_promotion(&db, &carts, &cfg, SESSION, "NOPE", None)
            .await
            .unwrap();
        assert_eq!(unknown.errors[0].kind(), "not_found");

        let bundle = apply_promotion(&db, &carts, &cfg, SESSION, "DUO", None)
            .await
            .unwrap();
        assert_eq!(bundle.errors[0].kind(), "ineligible_items");

        assert_eq!(
            carts.with_cart(SESSION, |s| s.promotion_code.clone()),
            Some("WELCOME10".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_cart_and_bad_format() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();

        let err = apply_promotion(&db, &carts, &config(), SESSION, "WELCOME10", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);

        let err = apply_promotion(&db, &carts, &config(), SESSION, "   ", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_remove_promotion() {
        let db = seeded_db().await;
        let carts = SessionCarts::new();
        add(&db, &carts, "latte").await;
        apply_promotion(&db, &carts, &config(), SESSION, "WELCOME10", None)
            .await
            .unwrap();

        let cart = remove_promotion(&carts, SESSION);
        assert_eq!(cart.promotion_code, None);
        assert_eq!(cart.items.len(), 1);
    }
}
