//! # Seed Data Generator
//!
//! Populates the database with a demo café menu for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./brewline_dev.db
//! cargo run -p brewline-db --bin seed
//!
//! # Specify database path
//! cargo run -p brewline-db --bin seed -- --db ./data/brewline.db
//! ```
//!
//! ## Generated Catalog
//! - Ingredients with density / per-unit weights, allergens and nutrition
//! - Add-on pricing in every mode (flat, per gram, per ml, per unit)
//! - Drinks with a base recipe and three sizes (one with its own recipe)
//! - One promotion of each kind

use std::collections::BTreeSet;
use std::env;

use brewline_core::{
    Drink, Ingredient, IngredientNutrition, IngredientPricing, Macros, MeasureUnit, PricingMode,
    Promotion, PromotionKind, RecipeLine, SizeVariant,
};
use brewline_db::{Database, DbConfig};
use chrono::{Duration, Utc};

/// (id, name, unit, grams per unit, density g/ml, allergens, add-on)
type IngredientSpec = (
    &'static str,
    &'static str,
    MeasureUnit,
    Option<f64>,
    Option<f64>,
    &'static [&'static str],
    bool,
);

const INGREDIENTS: &[IngredientSpec] = &[
    ("espresso", "Espresso", MeasureUnit::Milliliter, None, Some(1.0), &[], false),
    ("water", "Hot water", MeasureUnit::Milliliter, None, Some(1.0), &[], false),
    ("milk", "Whole milk", MeasureUnit::Milliliter, None, Some(1.03), &["milk"], false),
    ("oat_milk", "Oat milk", MeasureUnit::Milliliter, None, Some(1.02), &["gluten"], true),
    ("cocoa", "Cocoa sauce", MeasureUnit::Gram, None, Some(1.3), &["milk", "soy"], false),
    ("matcha", "Matcha powder", MeasureUnit::Scoop, Some(2.0), None, &[], false),
    ("ice", "Ice", MeasureUnit::Gram, None, Some(0.92), &[], false),
    ("vanilla_syrup", "Vanilla syrup", MeasureUnit::Piece, Some(10.0), Some(1.33), &[], true),
    ("caramel", "Caramel drizzle", MeasureUnit::Gram, None, Some(1.4), &["milk"], true),
    ("whipped_cream", "Whipped cream", MeasureUnit::Gram, None, None, &["milk"], true),
    ("extra_shot", "Extra espresso shot", MeasureUnit::Milliliter, None, Some(1.0), &[], true),
    ("protein", "Whey protein", MeasureUnit::Scoop, Some(30.0), None, &["milk"], true),
];

/// (ingredient id, kcal, protein, fat, carbs, sugar, fiber, sodium) per 100 g.
/// Whipped cream has no row, so drinks topped with it show an estimate.
const NUTRITION: &[(&str, [f64; 7])] = &[
    ("espresso", [9.0, 0.1, 0.2, 1.7, 0.0, 0.0, 14.0]),
    ("water", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 4.0]),
    ("milk", [64.0, 3.3, 3.6, 4.8, 4.8, 0.0, 44.0]),
    ("oat_milk", [46.0, 1.0, 1.5, 6.7, 4.0, 0.8, 42.0]),
    ("cocoa", [310.0, 3.0, 9.0, 55.0, 48.0, 4.0, 120.0]),
    ("matcha", [324.0, 30.6, 5.3, 38.5, 0.0, 38.5, 6.0]),
    ("ice", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
    ("vanilla_syrup", [330.0, 0.0, 0.0, 82.0, 82.0, 0.0, 0.0]),
    ("caramel", [380.0, 1.0, 6.0, 80.0, 70.0, 0.0, 300.0]),
    ("extra_shot", [9.0, 0.1, 0.2, 1.7, 0.0, 0.0, 14.0]),
    ("protein", [400.0, 80.0, 6.0, 8.0, 6.0, 0.0, 200.0]),
];

fn ingredient(spec: &IngredientSpec) -> Ingredient {
    let (id, name, unit, grams_per_unit, density, allergens, is_add_on) = *spec;
    Ingredient {
        id: id.to_string(),
        name: name.to_string(),
        default_unit: unit,
        grams_per_unit,
        density_g_per_ml: density,
        allergens: allergens.iter().map(|a| a.to_string()).collect::<BTreeSet<_>>(),
        is_active: true,
        is_add_on,
    }
}

fn pricing(
    ingredient_id: &str,
    mode: PricingMode,
    base_price_cents: i64,
    rate_centicents: Option<i64>,
    unit_label: Option<&str>,
) -> IngredientPricing {
    IngredientPricing {
        ingredient_id: ingredient_id.to_string(),
        mode,
        base_price_cents,
        rate_centicents,
        unit_label: unit_label.map(str::to_string),
    }
}

fn add_on_pricing() -> Vec<IngredientPricing> {
    vec![
        // 0.08¢ per ml of oat milk, flat fallback 60¢
        pricing("oat_milk", PricingMode::PerMilliliter, 0, Some(8), None),
        pricing("oat_milk", PricingMode::Flat, 60, None, None),
        pricing("vanilla_syrup", PricingMode::PerUnit, 0, Some(5000), Some("pump")),
        pricing("caramel", PricingMode::PerGram, 0, Some(400), None),
        pricing("whipped_cream", PricingMode::Flat, 75, None, None),
        pricing("extra_shot", PricingMode::PerMilliliter, 0, Some(300), None),
        pricing("protein", PricingMode::PerUnit, 0, Some(15000), Some("scoop")),
    ]
}

fn size(drink_id: &str, suffix: &str, name: &str, size_ml: f64, price_cents: i64) -> SizeVariant {
    SizeVariant {
        id: format!("{}_{}", drink_id, suffix),
        drink_id: drink_id.to_string(),
        name: name.to_string(),
        size_ml,
        price_cents,
        override_lines: None,
    }
}

fn drinks() -> Vec<(Drink, Vec<RecipeLine>, Vec<SizeVariant>)> {
    let drink = |id: &str, name: &str, base_size_ml: f64| Drink {
        id: id.to_string(),
        name: name.to_string(),
        base_size_ml,
        is_active: true,
    };

    let mut latte_large = size("latte", "large", "Large", 470.0, 575);
    // Large gets a third shot instead of a scaled 2.7
    latte_large.override_lines = Some(vec![
        RecipeLine::new("espresso", 90.0, MeasureUnit::Milliliter),
        RecipeLine::new("milk", 360.0, MeasureUnit::Milliliter),
    ]);

    vec![
        (
            drink("latte", "Caffè Latte", 350.0),
            vec![
                RecipeLine::new("espresso", 60.0, MeasureUnit::Milliliter),
                RecipeLine::new("milk", 270.0, MeasureUnit::Milliliter),
            ],
            vec![
                size("latte", "small", "Small", 240.0, 395),
                size("latte", "regular", "Regular", 350.0, 475),
                latte_large,
            ],
        ),
        (
            drink("americano", "Americano", 350.0),
            vec![
                RecipeLine::new("espresso", 60.0, MeasureUnit::Milliliter),
                RecipeLine::new("water", 290.0, MeasureUnit::Milliliter),
            ],
            vec![
                size("americano", "small", "Small", 240.0, 295),
                size("americano", "regular", "Regular", 350.0, 345),
                size("americano", "large", "Large", 470.0, 395),
            ],
        ),
        (
            drink("mocha", "Mocha", 350.0),
            vec![
                RecipeLine::new("espresso", 60.0, MeasureUnit::Milliliter),
                RecipeLine::new("cocoa", 25.0, MeasureUnit::Gram),
                RecipeLine::new("milk", 250.0, MeasureUnit::Milliliter),
            ],
            vec![
                size("mocha", "small", "Small", 240.0, 445),
                size("mocha", "regular", "Regular", 350.0, 525),
                size("mocha", "large", "Large", 470.0, 615),
            ],
        ),
        (
            drink("matcha_latte", "Matcha Latte", 350.0),
            vec![
                RecipeLine::new("matcha", 2.0, MeasureUnit::Scoop),
                RecipeLine::new("water", 30.0, MeasureUnit::Milliliter),
                RecipeLine::new("milk", 300.0, MeasureUnit::Milliliter),
            ],
            vec![
                size("matcha_latte", "regular", "Regular", 350.0, 525),
                size("matcha_latte", "large", "Large", 470.0, 625),
            ],
        ),
        (
            drink("iced_coffee", "Iced Coffee", 470.0),
            vec![
                RecipeLine::new("espresso", 90.0, MeasureUnit::Milliliter),
                RecipeLine::new("ice", 150.0, MeasureUnit::Gram),
                RecipeLine::new("water", 200.0, MeasureUnit::Milliliter),
            ],
            vec![
                size("iced_coffee", "regular", "Regular", 470.0, 395),
                size("iced_coffee", "large", "Large", 590.0, 465),
            ],
        ),
    ]
}

fn promotions() -> Vec<Promotion> {
    let now = Utc::now();
    let promo = |id: &str, code: &str, name: &str, kind: PromotionKind| Promotion {
        id: id.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        kind,
        priority: 0,
        is_active: true,
        starts_at: now - Duration::days(1),
        ends_at: Some(now + Duration::days(90)),
        min_subtotal_cents: None,
        max_uses_per_customer: None,
        created_at: now,
    };

    let mut welcome = promo(
        "promo_welcome",
        "WELCOME10",
        "10% off your first order",
        PromotionKind::Percentage { percent: 10 },
    );
    welcome.max_uses_per_customer = Some(1);

    let mut five_off = promo(
        "promo_five_off",
        "FIVEOFF",
        "$5 off orders over $20",
        PromotionKind::FixedAmount { amount_cents: 500 },
    );
    five_off.min_subtotal_cents = Some(2000);

    let mut bogo = promo(
        "promo_bogo_latte",
        "LATTEBOGO",
        "Buy one latte, get one free",
        PromotionKind::BuyXGetY {
            buy: 1,
            get: 1,
            drink_ids: vec!["latte".to_string()],
        },
    );
    bogo.priority = 10;

    vec![
        welcome,
        five_off,
        bogo,
        promo(
            "promo_free_syrup",
            "SWEET",
            "Free vanilla syrup",
            PromotionKind::FreeAddOn {
                add_on_ingredient_id: Some("vanilla_syrup".to_string()),
            },
        ),
        promo(
            "promo_morning_duo",
            "DUO",
            "Latte + Americano for $7",
            PromotionKind::Bundle {
                drink_ids: vec!["latte".to_string(), "americano".to_string()],
                bundle_price_cents: 700,
            },
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./brewline_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Brewline Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./brewline_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Brewline Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();
    let existing = catalog.list_active_drinks().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} drinks", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for spec in INGREDIENTS {
        catalog.upsert_ingredient(&ingredient(spec)).await?;
    }
    for (ingredient_id, v) in NUTRITION {
        catalog
            .upsert_nutrition(&IngredientNutrition {
                ingredient_id: ingredient_id.to_string(),
                per_100g: Macros {
                    energy_kcal: v[0],
                    protein_g: v[1],
                    fat_g: v[2],
                    carbohydrate_g: v[3],
                    sugar_g: v[4],
                    fiber_g: v[5],
                    sodium_mg: v[6],
                },
            })
            .await?;
    }
    for row in add_on_pricing() {
        catalog.upsert_pricing(&row).await?;
    }
    println!("✓ {} ingredients", INGREDIENTS.len());

    let menu = drinks();
    for (drink, base_lines, sizes) in &menu {
        catalog.insert_drink(drink, base_lines).await?;
        for (position, size) in sizes.iter().enumerate() {
            catalog.insert_size(size, position as i64).await?;
        }
    }
    println!("✓ {} drinks", menu.len());

    let promos = promotions();
    for promotion in &promos {
        db.promotions().insert(promotion).await?;
    }
    println!("✓ {} promotions", promos.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
