//! # Nutrition Aggregator
//!
//! Scales per-100g nutrition by normalized grams and sums across lines.
//!
//! ## Aggregation Flow
//! ```text
//! RecipeLine ──► Ingredient ──► to_grams ──► grams / 100 × per_100g
//!     │              │                              │
//!     │              └──► allergens ─────┐          │
//!     ▼                                  ▼          ▼
//!  missing? ─► gap + complete=false    union      Σ totals
//! ```
//!
//! ## Linearity
//! `aggregate(L1 ++ L2) == aggregate(L1).combine(aggregate(L2))`. Every line
//! contributes independently, so a cart's nutrition is the combination of
//! its items' nutrition.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::{Add, AddAssign};
use ts_rs::TS;

use crate::error::MissingData;
use crate::types::{Ingredient, IngredientNutrition, RecipeLine};
use crate::units::{missing_factor, to_grams};

// =============================================================================
// Macros
// =============================================================================

/// Nutrient amounts. Per 100 g in catalog rows, absolute in summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Macros {
    pub energy_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbohydrate_g: f64,
    pub sugar_g: f64,
    pub fiber_g: f64,
    pub sodium_mg: f64,
}

impl Macros {
    /// Multiplies every nutrient by `factor`.
    pub fn scale(&self, factor: f64) -> Macros {
        Macros {
            energy_kcal: self.energy_kcal * factor,
            protein_g: self.protein_g * factor,
            fat_g: self.fat_g * factor,
            carbohydrate_g: self.carbohydrate_g * factor,
            sugar_g: self.sugar_g * factor,
            fiber_g: self.fiber_g * factor,
            sodium_mg: self.sodium_mg * factor,
        }
    }

    /// Contribution of `grams` of an ingredient with these per-100g values.
    #[inline]
    pub fn for_grams(&self, grams: f64) -> Macros {
        self.scale(grams / 100.0)
    }

    /// Elementwise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Macros, epsilon: f64) -> bool {
        let pairs = [
            (self.energy_kcal, other.energy_kcal),
            (self.protein_g, other.protein_g),
            (self.fat_g, other.fat_g),
            (self.carbohydrate_g, other.carbohydrate_g),
            (self.sugar_g, other.sugar_g),
            (self.fiber_g, other.fiber_g),
            (self.sodium_mg, other.sodium_mg),
        ];
        pairs.iter().all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, other: Macros) -> Macros {
        Macros {
            energy_kcal: self.energy_kcal + other.energy_kcal,
            protein_g: self.protein_g + other.protein_g,
            fat_g: self.fat_g + other.fat_g,
            carbohydrate_g: self.carbohydrate_g + other.carbohydrate_g,
            sugar_g: self.sugar_g + other.sugar_g,
            fiber_g: self.fiber_g + other.fiber_g,
            sodium_mg: self.sodium_mg + other.sodium_mg,
        }
    }
}

impl AddAssign for Macros {
    fn add_assign(&mut self, other: Macros) {
        *self = *self + other;
    }
}

// =============================================================================
// Nutrition Summary
// =============================================================================

/// Aggregated nutrition for a set of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NutritionSummary {
    pub totals: Macros,
    pub allergens: BTreeSet<String>,

    /// False when an ingredient or nutrition row was missing.
    pub complete: bool,

    /// True when a unit conversion fell back to a 1:1 estimate.
    pub estimated: bool,

    /// Exactly what was missing, in first-seen order without duplicates.
    pub gaps: Vec<MissingData>,
}

impl Default for NutritionSummary {
    fn default() -> Self {
        NutritionSummary::empty()
    }
}

impl NutritionSummary {
    /// The identity for [`combine`](Self::combine).
    pub fn empty() -> Self {
        NutritionSummary {
            totals: Macros::default(),
            allergens: BTreeSet::new(),
            complete: true,
            estimated: false,
            gaps: Vec::new(),
        }
    }

    fn record_gap(&mut self, gap: MissingData) {
        if !self.gaps.contains(&gap) {
            self.gaps.push(gap);
        }
    }

    /// ⊕: sums totals, unions allergens, ANDs completeness.
    pub fn combine(mut self, other: NutritionSummary) -> NutritionSummary {
        self.totals += other.totals;
        self.allergens.extend(other.allergens);
        self.complete &= other.complete;
        self.estimated |= other.estimated;
        for gap in other.gaps {
            self.record_gap(gap);
        }
        self
    }

    /// Nutrition of `quantity` identical servings.
    pub fn scaled(&self, quantity: i64) -> NutritionSummary {
        NutritionSummary {
            totals: self.totals.scale(quantity.max(0) as f64),
            ..self.clone()
        }
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Aggregates nutrition across `lines`.
///
/// Missing ingredients and nutrition rows contribute zero and clear
/// `complete`. A known ingredient without nutrition still contributes its
/// allergens.
pub fn aggregate(
    lines: &[RecipeLine],
    ingredients: &HashMap<String, Ingredient>,
    nutrition: &HashMap<String, IngredientNutrition>,
) -> NutritionSummary {
    let mut summary = NutritionSummary::empty();

    for line in lines {
        let Some(ingredient) = ingredients.get(&line.ingredient_id) else {
            summary.complete = false;
            summary.record_gap(MissingData::Ingredient {
                ingredient_id: line.ingredient_id.clone(),
            });
            continue;
        };

        summary.allergens.extend(ingredient.allergens.iter().cloned());

        let grams = to_grams(line.amount, line.unit, ingredient);
        if !grams.exact {
            summary.estimated = true;
            if let Some(gap) = missing_factor(line.unit, ingredient) {
                summary.record_gap(gap);
            }
        }

        match nutrition.get(&line.ingredient_id) {
            Some(row) => summary.totals += row.per_100g.for_grams(grams.value),
            None => {
                summary.complete = false;
                summary.record_gap(MissingData::Nutrition {
                    ingredient_id: line.ingredient_id.clone(),
                });
            }
        }
    }

    summary
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeasureUnit;
    use proptest::prelude::*;

    fn ingredient(id: &str, density: Option<f64>, allergens: &[&str]) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: id.to_string(),
            default_unit: MeasureUnit::Gram,
            grams_per_unit: Some(10.0),
            density_g_per_ml: density,
            allergens: allergens.iter().map(|a| a.to_string()).collect(),
            is_active: true,
            is_add_on: false,
        }
    }

    fn per_100g(kcal: f64, sugar: f64) -> Macros {
        Macros {
            energy_kcal: kcal,
            sugar_g: sugar,
            ..Macros::default()
        }
    }

    fn catalog() -> (
        HashMap<String, Ingredient>,
        HashMap<String, IngredientNutrition>,
    ) {
        let ingredients = [
            ingredient("milk", Some(1.03), &["milk"]),
            ingredient("espresso", Some(1.0), &[]),
            ingredient("hazelnut", None, &["tree_nut"]),
            ingredient("oat-milk", Some(1.02), &["gluten"]),
        ]
        .into_iter()
        .map(|i| (i.id.clone(), i))
        .collect();

        let nutrition = [
            ("milk", per_100g(64.0, 4.8)),
            ("espresso", per_100g(2.0, 0.0)),
            ("hazelnut", per_100g(350.0, 80.0)),
        ]
        .into_iter()
        .map(|(id, m)| {
            (
                id.to_string(),
                IngredientNutrition {
                    ingredient_id: id.to_string(),
                    per_100g: m,
                },
            )
        })
        .collect();

        (ingredients, nutrition)
    }

    #[test]
    fn test_aggregate_sums_lines() {
        let (ingredients, nutrition) = catalog();
        let lines = vec![
            RecipeLine::new("milk", 200.0, MeasureUnit::Milliliter),
            RecipeLine::new("espresso", 36.0, MeasureUnit::Gram),
        ];

        let summary = aggregate(&lines, &ingredients, &nutrition);

        // 206 g milk × 0.64 + 36 g espresso × 0.02
        assert!((summary.totals.energy_kcal - (131.84 + 0.72)).abs() < 1e-9);
        assert!(summary.complete);
        assert!(!summary.estimated);
        assert_eq!(summary.allergens, BTreeSet::from(["milk".to_string()]));
    }

    #[test]
    fn test_missing_nutrition_row_marks_incomplete() {
        let (ingredients, nutrition) = catalog();
        let lines = vec![
            RecipeLine::new("espresso", 18.0, MeasureUnit::Gram),
            RecipeLine::new("oat-milk", 200.0, MeasureUnit::Milliliter),
        ];

        let summary = aggregate(&lines, &ingredients, &nutrition);

        assert!((summary.totals.energy_kcal - 0.36).abs() < 1e-9);
        assert!(!summary.complete);
        assert!(summary.allergens.contains("gluten"));
        assert_eq!(
            summary.gaps,
            vec![MissingData::Nutrition {
                ingredient_id: "oat-milk".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_ingredient_contributes_nothing() {
        let (ingredients, nutrition) = catalog();
        let lines = vec![RecipeLine::new("unicorn-dust", 5.0, MeasureUnit::Gram)];

        let summary = aggregate(&lines, &ingredients, &nutrition);

        assert_eq!(summary.totals, Macros::default());
        assert!(!summary.complete);
        assert!(matches!(summary.gaps[0], MissingData::Ingredient { .. }));
    }

    #[test]
    fn test_inexact_conversion_marks_estimated() {
        let (ingredients, nutrition) = catalog();
        let lines = vec![RecipeLine::new("hazelnut", 15.0, MeasureUnit::Milliliter)];

        let summary = aggregate(&lines, &ingredients, &nutrition);

        assert!(summary.complete);
        assert!(summary.estimated);
        assert!((summary.totals.sugar_g - 12.0).abs() < 1e-9);
        assert!(matches!(
            summary.gaps[0],
            MissingData::ConversionFactor {
                unit: MeasureUnit::Milliliter,
                ..
            }
        ));
    }

    #[test]
    fn test_gaps_are_not_duplicated() {
        let (ingredients, nutrition) = catalog();
        let lines = vec![
            RecipeLine::new("oat-milk", 100.0, MeasureUnit::Milliliter),
            RecipeLine::new("oat-milk", 50.0, MeasureUnit::Milliliter),
        ];
        assert_eq!(aggregate(&lines, &ingredients, &nutrition).gaps.len(), 1);
    }

    #[test]
    fn test_scaled_summary() {
        let (ingredients, nutrition) = catalog();
        let lines = vec![RecipeLine::new("milk", 100.0, MeasureUnit::Gram)];

        let single = aggregate(&lines, &ingredients, &nutrition);
        let triple = single.scaled(3);

        assert!((triple.totals.energy_kcal - 192.0).abs() < 1e-9);
        assert_eq!(triple.allergens, single.allergens);
    }

    fn arb_line() -> impl Strategy<Value = RecipeLine> {
        let ids = prop::sample::select(vec!["milk", "espresso", "hazelnut", "oat-milk", "ghost"]);
        let units = prop::sample::select(vec![
            MeasureUnit::Gram,
            MeasureUnit::Milliliter,
            MeasureUnit::Scoop,
            MeasureUnit::Piece,
        ]);
        (ids, 0.0f64..500.0, units).prop_map(|(id, amount, unit)| RecipeLine::new(id, amount, unit))
    }

    proptest! {
        #[test]
        fn prop_aggregation_is_linear(
            left in prop::collection::vec(arb_line(), 0..8),
            right in prop::collection::vec(arb_line(), 0..8),
        ) {
            let (ingredients, nutrition) = catalog();
            let joined: Vec<RecipeLine> = left.iter().chain(right.iter()).cloned().collect();

            let whole = aggregate(&joined, &ingredients, &nutrition);
            let parts = aggregate(&left, &ingredients, &nutrition)
                .combine(aggregate(&right, &ingredients, &nutrition));

            prop_assert!(whole.totals.approx_eq(&parts.totals, 1e-6));
            prop_assert_eq!(whole.allergens, parts.allergens);
            prop_assert_eq!(whole.complete, parts.complete);
            prop_assert_eq!(whole.estimated, parts.estimated);
            prop_assert_eq!(whole.gaps, parts.gaps);
        }
    }
}
