//! # Commands Module
//!
//! Every operation the storefront and staff tools call.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports, test fixtures)
//! ├── cart.rs       ◄─── Session cart manipulation
//! ├── promotion.rs  ◄─── Promotion codes on a session cart
//! ├── checkout.rs   ◄─── Cart → persisted order
//! ├── tracking.rs   ◄─── Customer-facing order lookup
//! └── status.rs     ◄─── Staff queue and status updates
//! ```
//!
//! ## State Injection
//! Each command declares only the state it needs:
//! ```rust,ignore
//! // Only needs carts
//! fn get_cart(carts: &SessionCarts, session_id: &str)
//!
//! // Needs database + carts + config (retry policy)
//! async fn add_to_cart(db: &Database, carts: &SessionCarts, config: &AppConfig, ...)
//!
//! // Staff side never touches carts
//! async fn update_order_status(db: &Database, config: &AppConfig, ...)
//! ```

pub mod cart;
pub mod checkout;
pub mod promotion;
pub mod status;
pub mod tracking;

pub use cart::{
    add_to_cart, clear_cart, get_cart, remove_from_cart, update_cart_item, AddToCartRequest,
    CartResponse,
};
pub use checkout::{checkout, CheckoutRequest, CheckoutResponse};
pub use promotion::{apply_promotion, remove_promotion, PromotionResponse};
pub use status::{list_queue, update_order_status};
pub use tracking::{track_order, TrackedItem, TrackedLine, TrackedOrder};

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeSet;
    use std::time::Duration as StdDuration;

    use brewline_core::{
        AddOnSelection, Drink, Ingredient, IngredientNutrition, IngredientPricing, Macros,
        MeasureUnit, PricingMode, Promotion, PromotionKind, RecipeLine, SizeVariant,
    };
    use brewline_db::{Database, DbConfig};
    use chrono::{Duration, Utc};

    use crate::config::AppConfig;

    pub(crate) const SESSION: &str = "session-1";

    fn ingredient(id: &str, unit: MeasureUnit, density: Option<f64>, add_on: bool) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: id.replace('_', " "),
            default_unit: unit,
            grams_per_unit: if unit == MeasureUnit::Piece { Some(10.0) } else { None },
            density_g_per_ml: density,
            allergens: BTreeSet::new(),
            is_active: true,
            is_add_on: add_on,
        }
    }

    fn macros(kcal: f64, sugar: f64) -> Macros {
        Macros {
            energy_kcal: kcal,
            sugar_g: sugar,
            ..Macros::default()
        }
    }

    fn promotion(id: &str, code: &str, kind: PromotionKind) -> Promotion {
        Promotion {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("{} promotion", code),
            kind,
            priority: 0,
            is_active: true,
            starts_at: Utc::now() - Duration::days(1),
            ends_at: Some(Utc::now() + Duration::days(30)),
            min_subtotal_cents: None,
            max_uses_per_customer: None,
            created_at: Utc::now() - Duration::days(1),
        }
    }

    /// Config with a fast retry policy.
    pub(crate) fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_ms = 5;
        config.retry.max_elapsed_ms = 100;
        config
    }

    pub(crate) fn syrup(pumps: f64) -> AddOnSelection {
        AddOnSelection {
            ingredient_id: "vanilla_syrup".to_string(),
            amount: pumps,
            unit: MeasureUnit::Piece,
            unit_label: Some("pump".to_string()),
        }
    }

    /// In-memory database with a two-drink menu.
    ///
    /// ```text
    /// latte      regular 350 ml $4.75   large 470 ml $5.75
    /// americano  regular 350 ml $3.45
    /// add-ons    vanilla_syrup 50¢/pump, whipped_cream 75¢ flat (no nutrition)
    /// codes      WELCOME10 (10%, once per customer), FIVEOFF ($5 over $20),
    ///            OLDNEWS (expired), DUO (latte + americano for $7)
    /// ```
    pub(crate) async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory().busy_timeout(StdDuration::from_secs(1)))
            .await
            .unwrap();
        let catalog = db.catalog();

        for ingredient in [
            ingredient("espresso", MeasureUnit::Milliliter, Some(1.0), false),
            ingredient("milk", MeasureUnit::Milliliter, Some(1.03), false),
            ingredient("water", MeasureUnit::Milliliter, Some(1.0), false),
            ingredient("vanilla_syrup", MeasureUnit::Piece, Some(1.33), true),
            ingredient("whipped_cream", MeasureUnit::Gram, None, true),
        ] {
            catalog.upsert_ingredient(&ingredient).await.unwrap();
        }

        for (id, per_100g) in [
            ("espresso", macros(9.0, 0.0)),
            ("milk", macros(64.0, 4.8)),
            ("water", macros(0.0, 0.0)),
            ("vanilla_syrup", macros(330.0, 82.0)),
        ] {
            catalog
                .upsert_nutrition(&IngredientNutrition {
                    ingredient_id: id.to_string(),
                    per_100g,
                })
                .await
                .unwrap();
        }

        for row in [
            IngredientPricing {
                ingredient_id: "vanilla_syrup".to_string(),
                mode: PricingMode::PerUnit,
                base_price_cents: 0,
                rate_centicents: Some(5000),
                unit_label: Some("pump".to_string()),
            },
            IngredientPricing {
                ingredient_id: "whipped_cream".to_string(),
                mode: PricingMode::Flat,
                base_price_cents: 75,
                rate_centicents: None,
                unit_label: None,
            },
        ] {
            catalog.upsert_pricing(&row).await.unwrap();
        }

        let drink = |id: &str, name: &str| Drink {
            id: id.to_string(),
            name: name.to_string(),
            base_size_ml: 350.0,
            is_active: true,
        };
        let size = |drink_id: &str, suffix: &str, size_ml: f64, price_cents: i64| SizeVariant {
            id: format!("{}_{}", drink_id, suffix),
            drink_id: drink_id.to_string(),
            name: suffix.to_string(),
            size_ml,
            price_cents,
            override_lines: None,
        };

        catalog
            .insert_drink(
                &drink("latte", "Caffè Latte"),
                &[
                    RecipeLine::new("espresso", 60.0, MeasureUnit::Milliliter),
                    RecipeLine::new("milk", 270.0, MeasureUnit::Milliliter),
                ],
            )
            .await
            .unwrap();
        catalog
            .insert_size(&size("latte", "regular", 350.0, 475), 0)
            .await
            .unwrap();
        catalog
            .insert_size(&size("latte", "large", 470.0, 575), 1)
            .await
            .unwrap();

        catalog
            .insert_drink(
                &drink("americano", "Americano"),
                &[
                    RecipeLine::new("espresso", 60.0, MeasureUnit::Milliliter),
                    RecipeLine::new("water", 290.0, MeasureUnit::Milliliter),
                ],
            )
            .await
            .unwrap();
        catalog
            .insert_size(&size("americano", "regular", 350.0, 345), 0)
            .await
            .unwrap();

        let promotions = db.promotions();

        let mut welcome = promotion("promo_welcome", "WELCOME10", PromotionKind::Percentage {
            percent: 10,
        });
        welcome.max_uses_per_customer = Some(1);
        promotions.insert(&welcome).await.unwrap();

        let mut five_off = promotion("promo_five_off", "FIVEOFF", PromotionKind::FixedAmount {
            amount_cents: 500,
        });
        five_off.min_subtotal_cents = Some(2000);
        promotions.insert(&five_off).await.unwrap();

        let mut expired = promotion("promo_old", "OLDNEWS", PromotionKind::Percentage {
            percent: 50,
        });
        expired.ends_at = Some(Utc::now() - Duration::days(1));
        promotions.insert(&expired).await.unwrap();

        promotions
            .insert(&promotion("promo_duo", "DUO", PromotionKind::Bundle {
                drink_ids: vec!["latte".to_string(), "americano".to_string()],
                bundle_price_cents: 700,
            }))
            .await
            .unwrap();

        db
    }
}
