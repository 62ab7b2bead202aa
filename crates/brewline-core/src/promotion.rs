//! # Promotion Engine
//!
//! Validates a promotion code against a cart and computes a bounded discount.
//!
//! ## Validation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  code ──► candidates with that code (none → not_found)                  │
//! │                │                                                        │
//! │                ▼  for each candidate, stop at the first failure:        │
//! │    1. active flag on, window opened         else inactive               │
//! │    2. window not closed (open end = never)  else expired                │
//! │    3. subtotal ≥ minimum                    else threshold_not_met      │
//! │    4. cart has what the type needs          else ineligible_items       │
//! │    5. customer below usage cap              else usage_exceeded         │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  eligible? ──► highest priority wins, ties → most recently created      │
//! │  none?     ──► error of the top-ranked candidate                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exactly one promotion applies to an order. Discounts never stack.
//!
//! ## Discount Bounds
//! Whatever the type computes, the applied discount is clamped into
//! `0..=subtotal` and the new subtotal is `max(0, subtotal − discount)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use ts_rs::TS;

use crate::cart::CartItem;
use crate::error::PromotionError;
use crate::money::Money;

// =============================================================================
// Promotion Types
// =============================================================================

/// What a promotion gives, with its type-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromotionKind {
    /// `percent` of the subtotal.
    Percentage { percent: u32 },

    /// A fixed amount off, never more than the subtotal.
    FixedAmount { amount_cents: i64 },

    /// The listed drinks together for `bundle_price_cents`.
    ///
    /// A drink id listed twice needs two units of that drink.
    Bundle {
        drink_ids: Vec<String>,
        bundle_price_cents: i64,
    },

    /// One add-on free: the designated one, or else the cheapest in the cart.
    FreeAddOn { add_on_ingredient_id: Option<String> },

    /// For every `buy + get` qualifying units, `get` are free (cheapest first).
    ///
    /// An empty `drink_ids` list qualifies every drink.
    BuyXGetY {
        buy: u32,
        get: u32,
        drink_ids: Vec<String>,
    },
}

/// A promotion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Promotion {
    pub id: String,

    /// Redemption code, stored upper-case.
    pub code: String,

    pub name: String,
    pub kind: PromotionKind,

    /// Higher wins when several promotions are eligible.
    pub priority: i32,

    pub is_active: bool,

    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,

    /// `None` never expires.
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,

    pub min_subtotal_cents: Option<i64>,
    pub max_uses_per_customer: Option<u32>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    /// Checks every rule for this promotion, in order.
    pub fn check(
        &self,
        items: &[CartItem],
        subtotal: Money,
        customer_id: Option<&str>,
        usage: &impl RedemptionCounts,
        now: DateTime<Utc>,
    ) -> Result<(), PromotionError> {
        if !self.is_active || now < self.starts_at {
            return Err(PromotionError::Inactive {
                code: self.code.clone(),
            });
        }
        if matches!(self.ends_at, Some(ends_at) if now > ends_at) {
            return Err(PromotionError::Expired {
                code: self.code.clone(),
            });
        }
        if let Some(required) = self.min_subtotal_cents {
            if subtotal.cents() < required {
                return Err(PromotionError::ThresholdNotMet {
                    code: self.code.clone(),
                    required_cents: required,
                    subtotal_cents: subtotal.cents(),
                });
            }
        }

        raw_discount(self, items, subtotal)?;

        if let (Some(limit), Some(customer)) = (self.max_uses_per_customer, customer_id) {
            if usage.redemptions(&self.id, customer) >= limit {
                return Err(PromotionError::UsageExceeded {
                    code: self.code.clone(),
                    limit,
                });
            }
        }

        Ok(())
    }
}

/// Ranking: higher priority first, then most recently created.
fn rank(a: &Promotion, b: &Promotion) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Normalizes a customer-entered code for lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// =============================================================================
// Redemption Counts
// =============================================================================

/// Source of per-customer redemption counts.
pub trait RedemptionCounts {
    fn redemptions(&self, promotion_id: &str, customer_id: &str) -> u32;
}

/// Counts keyed by `(promotion_id, customer_id)`.
impl RedemptionCounts for HashMap<(String, String), u32> {
    fn redemptions(&self, promotion_id: &str, customer_id: &str) -> u32 {
        self.get(&(promotion_id.to_string(), customer_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// No recorded redemptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRedemptions;

impl RedemptionCounts for NoRedemptions {
    fn redemptions(&self, _promotion_id: &str, _customer_id: &str) -> u32 {
        0
    }
}

// =============================================================================
// Validate
// =============================================================================

/// Result of validating a code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PromotionValidation {
    pub valid: bool,
    pub promotion: Option<Promotion>,
    pub error: Option<PromotionError>,
}

impl PromotionValidation {
    fn ok(promotion: Promotion) -> Self {
        PromotionValidation {
            valid: true,
            promotion: Some(promotion),
            error: None,
        }
    }

    fn rejected(error: PromotionError) -> Self {
        PromotionValidation {
            valid: false,
            promotion: None,
            error: Some(error),
        }
    }
}

/// Validates `code` against the cart.
///
/// `candidates` are the promotion records the caller looked up; only those
/// whose code matches are considered.
pub fn validate(
    code: &str,
    candidates: &[Promotion],
    items: &[CartItem],
    subtotal: Money,
    customer_id: Option<&str>,
    usage: &impl RedemptionCounts,
    now: DateTime<Utc>,
) -> PromotionValidation {
    let wanted = normalize_code(code);
    let mut matching: Vec<&Promotion> = candidates
        .iter()
        .filter(|p| normalize_code(&p.code) == wanted)
        .collect();

    if matching.is_empty() {
        return PromotionValidation::rejected(PromotionError::NotFound { code: wanted });
    }
    matching.sort_by(|a, b| rank(a, b));

    let mut first_error = None;
    for promotion in matching {
        match promotion.check(items, subtotal, customer_id, usage, now) {
            Ok(()) => return PromotionValidation::ok(promotion.clone()),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    // matching was non-empty, so at least one error was recorded
    PromotionValidation {
        valid: false,
        promotion: None,
        error: first_error,
    }
}

/// Picks the single best eligible promotion among `promotions`, regardless
/// of code.
pub fn best_eligible<'a>(
    promotions: &'a [Promotion],
    items: &[CartItem],
    subtotal: Money,
    customer_id: Option<&str>,
    usage: &impl RedemptionCounts,
    now: DateTime<Utc>,
) -> Option<&'a Promotion> {
    promotions
        .iter()
        .filter(|p| p.check(items, subtotal, customer_id, usage, now).is_ok())
        .min_by(|a, b| rank(a, b))
}

// =============================================================================
// Apply
// =============================================================================

/// Result of applying a validated promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PromotionOutcome {
    pub success: bool,
    pub discount_cents: i64,
    pub new_subtotal_cents: i64,
    pub errors: Vec<PromotionError>,
}

/// Computes the discount `promotion` gives this cart.
///
/// Only the cart-content rules are re-checked here; call [`validate`] first
/// for the window, threshold and usage rules.
pub fn apply(promotion: &Promotion, items: &[CartItem], subtotal: Money) -> PromotionOutcome {
    match raw_discount(promotion, items, subtotal) {
        Ok(raw) => {
            let discount = raw.clamp_to(subtotal);
            PromotionOutcome {
                success: true,
                discount_cents: discount.cents(),
                new_subtotal_cents: subtotal.saturating_sub_floor(discount).cents(),
                errors: Vec::new(),
            }
        }
        Err(err) => PromotionOutcome {
            success: false,
            discount_cents: 0,
            new_subtotal_cents: subtotal.saturating_sub_floor(Money::zero()).cents(),
            errors: vec![err],
        },
    }
}

// =============================================================================
// Discount Rules
// =============================================================================

fn ineligible(promotion: &Promotion, reason: impl Into<String>) -> PromotionError {
    PromotionError::IneligibleItems {
        code: promotion.code.clone(),
        reason: reason.into(),
    }
}

/// Unclamped discount for each type, or why the cart does not qualify.
fn raw_discount(
    promotion: &Promotion,
    items: &[CartItem],
    subtotal: Money,
) -> Result<Money, PromotionError> {
    if items.is_empty() {
        return Err(ineligible(promotion, "cart is empty"));
    }

    match &promotion.kind {
        PromotionKind::Percentage { percent } => Ok(subtotal.percentage(*percent)),

        PromotionKind::FixedAmount { amount_cents } => Ok(Money::from_cents(*amount_cents)),

        PromotionKind::Bundle {
            drink_ids,
            bundle_price_cents,
        } => {
            if drink_ids.is_empty() {
                return Err(ineligible(promotion, "bundle lists no drinks"));
            }
            let mut available = drink_units(items, |_| true);
            // Most expensive first so each constituent takes the best unit.
            available.sort_by(|a, b| b.1.cmp(&a.1));

            let mut constituents = Money::zero();
            for drink_id in drink_ids {
                let Some(pos) = available.iter().position(|(id, _)| id == drink_id) else {
                    return Err(ineligible(
                        promotion,
                        format!("bundle needs drink {}", drink_id),
                    ));
                };
                constituents += available.remove(pos).1;
            }
            Ok(constituents.saturating_sub_floor(Money::from_cents(*bundle_price_cents)))
        }

        PromotionKind::FreeAddOn {
            add_on_ingredient_id,
        } => {
            let add_ons = items.iter().flat_map(|item| item.add_ons.iter());
            let price = match add_on_ingredient_id {
                Some(wanted) => add_ons
                    .filter(|a| &a.ingredient_id == wanted)
                    .map(|a| a.price_cents)
                    .max()
                    .ok_or_else(|| {
                        ineligible(promotion, format!("cart has no {} add-on", wanted))
                    })?,
                None => add_ons
                    .map(|a| a.price_cents)
                    .min()
                    .ok_or_else(|| ineligible(promotion, "cart has no add-ons"))?,
            };
            Ok(Money::from_cents(price))
        }

        PromotionKind::BuyXGetY {
            buy,
            get,
            drink_ids,
        } => {
            let group = buy.saturating_add(*get) as usize;
            if *buy == 0 || *get == 0 {
                return Err(ineligible(promotion, "promotion has no free units"));
            }

            let mut units: Vec<Money> = drink_units(items, |id| {
                drink_ids.is_empty() || drink_ids.iter().any(|d| d == id)
            })
            .into_iter()
            .map(|(_, price)| price)
            .collect();

            let free = (units.len() / group) * (*get as usize);
            if free == 0 {
                return Err(ineligible(
                    promotion,
                    format!("needs {} qualifying drinks", group),
                ));
            }
            units.sort();
            Ok(units.into_iter().take(free).sum())
        }
    }
}

/// Every drink unit in the cart as `(drink_id, unit price)`.
fn drink_units(items: &[CartItem], qualifies: impl Fn(&str) -> bool) -> Vec<(String, Money)> {
    items
        .iter()
        .filter(|item| qualifies(&item.drink_id))
        .flat_map(|item| {
            std::iter::repeat((item.drink_id.clone(), item.unit_price()))
                .take(item.quantity.max(0) as usize)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartAddOn;
    use crate::nutrition::NutritionSummary;
    use crate::types::MeasureUnit;
    use chrono::Duration;
    use proptest::prelude::*;

    fn item(drink_id: &str, unit_price_cents: i64, quantity: i64, add_ons: &[(&str, i64)]) -> CartItem {
        CartItem {
            id: format!("{}-{}", drink_id, unit_price_cents),
            drink_id: drink_id.to_string(),
            drink_name: drink_id.to_string(),
            size_id: format!("{}-m", drink_id),
            size_name: "Medium".to_string(),
            size_ml: 350.0,
            lines: Vec::new(),
            add_ons: add_ons
                .iter()
                .map(|(id, cents)| CartAddOn {
                    ingredient_id: id.to_string(),
                    name: id.to_string(),
                    amount: 1.0,
                    unit: MeasureUnit::Piece,
                    unit_label: None,
                    price_cents: *cents,
                })
                .collect(),
            size_price_cents: unit_price_cents,
            unit_price_cents,
            quantity,
            pricing_exact: true,
            nutrition: NutritionSummary::empty(),
            added_at: Utc::now(),
        }
    }

    fn promo(code: &str, kind: PromotionKind) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: format!("promo-{}", code.to_lowercase()),
            code: code.to_string(),
            name: code.to_string(),
            kind,
            priority: 0,
            is_active: true,
            starts_at: now - Duration::days(1),
            ends_at: None,
            min_subtotal_cents: None,
            max_uses_per_customer: None,
            created_at: now - Duration::days(2),
        }
    }

    fn subtotal(items: &[CartItem]) -> Money {
        items.iter().map(CartItem::line_total).sum()
    }

    #[test]
    fn test_percentage_discount() {
        let items = vec![item("latte", 500, 1, &[])];
        let outcome = apply(
            &promo("TEN", PromotionKind::Percentage { percent: 10 }),
            &items,
            Money::from_cents(500),
        );
        assert!(outcome.success);
        assert_eq!(outcome.discount_cents, 50);
        assert_eq!(outcome.new_subtotal_cents, 450);
    }

    #[test]
    fn test_fixed_amount_capped_at_subtotal() {
        let items = vec![item("espresso", 30, 1, &[])];
        let outcome = apply(
            &promo("FIFTY", PromotionKind::FixedAmount { amount_cents: 50 }),
            &items,
            Money::from_cents(30),
        );
        assert_eq!(outcome.discount_cents, 30);
        assert_eq!(outcome.new_subtotal_cents, 0);
    }

    #[test]
    fn test_bundle_discount() {
        let items = vec![item("latte", 450, 1, &[]), item("croissant", 350, 1, &[])];
        let bundle = promo(
            "BREAKFAST",
            PromotionKind::Bundle {
                drink_ids: vec!["latte".to_string(), "croissant".to_string()],
                bundle_price_cents: 700,
            },
        );
        assert_eq!(apply(&bundle, &items, subtotal(&items)).discount_cents, 100);

        let partial = vec![item("latte", 450, 1, &[])];
        let outcome = apply(&bundle, &partial, subtotal(&partial));
        assert!(!outcome.success);
        assert_eq!(outcome.errors[0].kind(), "ineligible_items");
    }

    #[test]
    fn test_bundle_never_negative() {
        let items = vec![item("latte", 300, 1, &[])];
        let bundle = promo(
            "PRICEY",
            PromotionKind::Bundle {
                drink_ids: vec!["latte".to_string()],
                bundle_price_cents: 900,
            },
        );
        let outcome = apply(&bundle, &items, subtotal(&items));
        assert!(outcome.success);
        assert_eq!(outcome.discount_cents, 0);
    }

    #[test]
    fn test_free_add_on_cheapest_or_designated() {
        let items = vec![item("latte", 510, 1, &[("vanilla", 60), ("whipped-cream", 50)])];
        let cheapest = promo("FREEBIE", PromotionKind::FreeAddOn { add_on_ingredient_id: None });
        assert_eq!(apply(&cheapest, &items, subtotal(&items)).discount_cents, 50);

        let designated = promo(
            "VANILLA",
            PromotionKind::FreeAddOn {
                add_on_ingredient_id: Some("vanilla".to_string()),
            },
        );
        assert_eq!(apply(&designated, &items, subtotal(&items)).discount_cents, 60);

        let caramel = promo(
            "CARAMEL",
            PromotionKind::FreeAddOn {
                add_on_ingredient_id: Some("caramel".to_string()),
            },
        );
        assert!(!apply(&caramel, &items, subtotal(&items)).success);
    }

    #[test]
    fn test_buy_two_get_one_frees_cheapest() {
        // 7 qualifying units → (7 / 3) × 1 = 2 free, the two cheapest
        let items = vec![
            item("latte", 500, 3, &[]),
            item("mocha", 550, 2, &[]),
            item("americano", 300, 2, &[]),
            item("tea", 250, 4, &[]),
        ];
        let b2g1 = promo(
            "B2G1",
            PromotionKind::BuyXGetY {
                buy: 2,
                get: 1,
                drink_ids: vec!["latte".into(), "mocha".into(), "americano".into()],
            },
        );
        assert_eq!(apply(&b2g1, &items, subtotal(&items)).discount_cents, 600);
    }

    #[test]
    fn test_buy_x_get_y_not_enough_units() {
        let items = vec![item("latte", 500, 2, &[])];
        let b2g1 = promo(
            "B2G1",
            PromotionKind::BuyXGetY {
                buy: 2,
                get: 1,
                drink_ids: vec![],
            },
        );
        let outcome = apply(&b2g1, &items, subtotal(&items));
        assert!(!outcome.success);
        assert_eq!(outcome.new_subtotal_cents, 1000);
    }

    #[test]
    fn test_validate_not_found_and_case_insensitive() {
        let items = vec![item("latte", 500, 1, &[])];
        let promos = vec![promo("WELCOME", PromotionKind::Percentage { percent: 10 })];

        let result = validate("nope", &promos, &items, subtotal(&items), None, &NoRedemptions, Utc::now());
        assert!(!result.valid);
        assert_eq!(result.error.unwrap().kind(), "not_found");

        let result = validate(" welcome ", &promos, &items, subtotal(&items), None, &NoRedemptions, Utc::now());
        assert!(result.valid);
    }

    #[test]
    fn test_validate_window() {
        let items = vec![item("latte", 500, 1, &[])];
        let now = Utc::now();

        let mut future = promo("SOON", PromotionKind::Percentage { percent: 10 });
        future.starts_at = now + Duration::days(1);
        let result = validate("SOON", &[future], &items, subtotal(&items), None, &NoRedemptions, now);
        assert_eq!(result.error.unwrap().kind(), "inactive");

        let mut past = promo("OLD", PromotionKind::Percentage { percent: 10 });
        past.ends_at = Some(now - Duration::hours(1));
        let result = validate("OLD", &[past], &items, subtotal(&items), None, &NoRedemptions, now);
        assert_eq!(result.error.unwrap().kind(), "expired");

        let mut disabled = promo("OFF", PromotionKind::Percentage { percent: 10 });
        disabled.is_active = false;
        let result = validate("OFF", &[disabled], &items, subtotal(&items), None, &NoRedemptions, now);
        assert_eq!(result.error.unwrap().kind(), "inactive");
    }

    #[test]
    fn test_validate_threshold_before_usage() {
        let items = vec![item("latte", 500, 1, &[])];
        let mut p = promo("BIG", PromotionKind::FixedAmount { amount_cents: 200 });
        p.min_subtotal_cents = Some(1000);
        p.max_uses_per_customer = Some(1);

        let mut usage = HashMap::new();
        usage.insert((p.id.clone(), "cust-1".to_string()), 1);

        let result = validate("BIG", &[p], &items, subtotal(&items), Some("cust-1"), &usage, Utc::now());
        assert!(matches!(
            result.error,
            Some(PromotionError::ThresholdNotMet {
                required_cents: 1000,
                subtotal_cents: 500,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_usage_cap() {
        let items = vec![item("latte", 500, 1, &[])];
        let mut p = promo("ONCE", PromotionKind::Percentage { percent: 20 });
        p.max_uses_per_customer = Some(1);

        let mut usage = HashMap::new();
        usage.insert((p.id.clone(), "cust-1".to_string()), 1);

        let repeat = validate("ONCE", &[p.clone()], &items, subtotal(&items), Some("cust-1"), &usage, Utc::now());
        assert_eq!(repeat.error.unwrap().kind(), "usage_exceeded");

        let other = validate("ONCE", &[p.clone()], &items, subtotal(&items), Some("cust-2"), &usage, Utc::now());
        assert!(other.valid);

        // Anonymous checkouts carry no redemption history.
        let anonymous = validate("ONCE", &[p], &items, subtotal(&items), None, &usage, Utc::now());
        assert!(anonymous.valid);
    }

    #[test]
    fn test_highest_priority_then_newest_wins() {
        let items = vec![item("latte", 500, 1, &[])];
        let now = Utc::now();

        let mut low = promo("SPRING", PromotionKind::Percentage { percent: 50 });
        low.id = "low".to_string();
        let mut high_old = promo("SPRING", PromotionKind::Percentage { percent: 10 });
        high_old.id = "high-old".to_string();
        high_old.priority = 5;
        let mut high_new = promo("SPRING", PromotionKind::Percentage { percent: 15 });
        high_new.id = "high-new".to_string();
        high_new.priority = 5;
        high_new.created_at = now - Duration::hours(1);

        let candidates = vec![low, high_old, high_new];
        let result = validate("SPRING", &candidates, &items, subtotal(&items), None, &NoRedemptions, now);
        assert_eq!(result.promotion.unwrap().id, "high-new");

        let best = best_eligible(&candidates, &items, subtotal(&items), None, &NoRedemptions, now);
        assert_eq!(best.unwrap().id, "high-new");
    }

    #[test]
    fn test_ineligible_top_candidate_falls_through() {
        let items = vec![item("latte", 500, 1, &[])];
        let now = Utc::now();

        let mut top = promo("DUO", PromotionKind::FixedAmount { amount_cents: 100 });
        top.id = "top".to_string();
        top.priority = 10;
        top.min_subtotal_cents = Some(5000);
        let mut fallback = promo("DUO", PromotionKind::FixedAmount { amount_cents: 50 });
        fallback.id = "fallback".to_string();

        let result = validate("DUO", &[top.clone(), fallback], &items, subtotal(&items), None, &NoRedemptions, now);
        assert_eq!(result.promotion.unwrap().id, "fallback");

        let result = validate("DUO", &[top], &items, subtotal(&items), None, &NoRedemptions, now);
        assert_eq!(result.error.unwrap().kind(), "threshold_not_met");
    }

    fn arb_kind() -> impl Strategy<Value = PromotionKind> {
        prop_oneof![
            (0u32..300).prop_map(|percent| PromotionKind::Percentage { percent }),
            (-500i64..5_000).prop_map(|amount_cents| PromotionKind::FixedAmount { amount_cents }),
            (0i64..3_000).prop_map(|bundle_price_cents| PromotionKind::Bundle {
                drink_ids: vec!["latte".to_string(), "mocha".to_string()],
                bundle_price_cents,
            }),
            Just(PromotionKind::FreeAddOn { add_on_ingredient_id: None }),
            (1u32..4, 1u32..3).prop_map(|(buy, get)| PromotionKind::BuyXGetY {
                buy,
                get,
                drink_ids: vec![],
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_discount_is_bounded(
            kind in arb_kind(),
            latte_qty in 0i64..6,
            mocha_qty in 0i64..6,
            add_on_cents in 0i64..200,
            subtotal_cents in 0i64..10_000,
        ) {
            let mut items = Vec::new();
            if latte_qty > 0 {
                items.push(item("latte", 450, latte_qty, &[("vanilla", add_on_cents)]));
            }
            if mocha_qty > 0 {
                items.push(item("mocha", 525, mocha_qty, &[]));
            }
            let subtotal = Money::from_cents(subtotal_cents);
            let outcome = apply(&promo("ANY", kind), &items, subtotal);

            prop_assert!(outcome.discount_cents >= 0);
            prop_assert!(outcome.discount_cents <= subtotal_cents);
            prop_assert_eq!(
                outcome.new_subtotal_cents,
                (subtotal_cents - outcome.discount_cents).max(0)
            );
        }
    }
}
