//! # Catalog Snapshot
//!
//! The slice of catalog data one computation needs, indexed by ingredient id.
//!
//! The core never fetches records. The database layer loads the ingredients
//! referenced by a cart (or a whole menu) into a `CatalogSnapshot` and hands
//! it to the pure functions in `nutrition`, `pricing` and `cart`.

use std::collections::HashMap;

use crate::nutrition::{aggregate, NutritionSummary};
use crate::types::{Ingredient, IngredientNutrition, IngredientPricing, RecipeLine};

/// Ingredients, nutrition rows and pricing rows keyed by ingredient id.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub ingredients: HashMap<String, Ingredient>,
    pub nutrition: HashMap<String, IngredientNutrition>,
    pub pricing: HashMap<String, Vec<IngredientPricing>>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from flat row lists.
    pub fn from_rows(
        ingredients: Vec<Ingredient>,
        nutrition: Vec<IngredientNutrition>,
        pricing: Vec<IngredientPricing>,
    ) -> Self {
        let mut snapshot = CatalogSnapshot::new();
        for ingredient in ingredients {
            snapshot.insert_ingredient(ingredient);
        }
        for row in nutrition {
            snapshot.insert_nutrition(row);
        }
        for row in pricing {
            snapshot.insert_pricing(row);
        }
        snapshot
    }

    pub fn insert_ingredient(&mut self, ingredient: Ingredient) {
        self.ingredients.insert(ingredient.id.clone(), ingredient);
    }

    pub fn insert_nutrition(&mut self, row: IngredientNutrition) {
        self.nutrition.insert(row.ingredient_id.clone(), row);
    }

    /// Adds a pricing row, replacing an existing row for the same mode.
    pub fn insert_pricing(&mut self, row: IngredientPricing) {
        let rows = self.pricing.entry(row.ingredient_id.clone()).or_default();
        rows.retain(|existing| existing.mode != row.mode);
        rows.push(row);
    }

    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredients.get(id)
    }

    /// Pricing rows for an ingredient (empty when none are configured).
    pub fn pricing_rows(&self, id: &str) -> &[IngredientPricing] {
        self.pricing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Aggregated nutrition for `lines` against this snapshot.
    pub fn nutrition_for(&self, lines: &[RecipeLine]) -> NutritionSummary {
        aggregate(lines, &self.ingredients, &self.nutrition)
    }
}
