//! # Cart
//!
//! Session-owned shopping cart for made-to-order drinks.
//!
//! ## Building an Item
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Drink + SizeVariant + add-on selections                                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  resolve_lines(base, base_size_ml, size)     concrete base lines        │
//! │        │                                                                │
//! │        ├──► add-ons priced with price_line   (extras, role = extra)     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  unit price = size price + Σ add-on prices                              │
//! │  nutrition  = aggregate(base lines ++ extras)                           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  CartItem (frozen snapshot, owned by one CartState)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Identical configurations merge (same drink, size and add-ons)
//! - Quantity is 1..=MAX_ITEM_QUANTITY; setting 0 removes the item
//! - At most MAX_CART_ITEMS distinct items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::CatalogSnapshot;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::nutrition::NutritionSummary;
use crate::pricing::price_line;
use crate::recipe::resolve_lines;
use crate::types::{Drink, LineRole, MeasureUnit, RecipeLine, SizeVariant};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// An add-on the customer asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddOnSelection {
    pub ingredient_id: String,
    pub amount: f64,
    pub unit: MeasureUnit,
    #[serde(default)]
    pub unit_label: Option<String>,
}

impl AddOnSelection {
    fn to_line(&self) -> RecipeLine {
        RecipeLine {
            ingredient_id: self.ingredient_id.clone(),
            amount: self.amount,
            unit: self.unit,
            role: LineRole::Extra,
            unit_label: self.unit_label.clone(),
        }
    }
}

/// A priced add-on on a cart item (per drink).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartAddOn {
    pub ingredient_id: String,
    pub name: String,
    pub amount: f64,
    pub unit: MeasureUnit,
    pub unit_label: Option<String>,
    pub price_cents: i64,
}

/// A configured drink in the cart.
///
/// Names, lines and prices are frozen when the item is built. Checkout
/// rebuilds items from the catalog, so a stale snapshot can never be charged.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub id: String,
    pub drink_id: String,
    pub drink_name: String,
    pub size_id: String,
    pub size_name: String,
    pub size_ml: f64,

    /// Resolved recipe lines followed by the add-on lines.
    pub lines: Vec<RecipeLine>,

    pub add_ons: Vec<CartAddOn>,
    pub size_price_cents: i64,

    /// Size price plus add-on prices, for one drink.
    pub unit_price_cents: i64,

    pub quantity: i64,

    /// False when an add-on price was a degraded estimate.
    pub pricing_exact: bool,

    /// Nutrition for one drink.
    pub nutrition: NutritionSummary,

    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Lines that came from the recipe. A recipe may carry its own
    /// extra-role lines; those are part of the size price.
    pub fn recipe_lines(&self) -> &[RecipeLine] {
        &self.lines[..self.first_add_on_line()]
    }

    /// Lines added by selections, parallel to `add_ons`.
    pub fn add_on_lines(&self) -> &[RecipeLine] {
        &self.lines[self.first_add_on_line()..]
    }

    fn first_add_on_line(&self) -> usize {
        self.lines.len().saturating_sub(self.add_ons.len())
    }

    /// Nutrition for the whole line.
    pub fn line_nutrition(&self) -> NutritionSummary {
        self.nutrition.scaled(self.quantity)
    }

    /// True when `other` is the same drink, size and add-on configuration.
    pub fn same_configuration(&self, other: &CartItem) -> bool {
        self.drink_id == other.drink_id
            && self.size_id == other.size_id
            && self.add_ons.len() == other.add_ons.len()
            && self.add_ons.iter().zip(other.add_ons.iter()).all(|(a, b)| {
                a.ingredient_id == b.ingredient_id
                    && a.amount == b.amount
                    && a.unit == b.unit
                    && a.unit_label == b.unit_label
            })
    }
}

fn check_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Builds a priced cart item.
///
/// ## Errors
/// - `DrinkNotFound` when the drink is inactive
/// - `SizeNotFound` when the size belongs to another drink
/// - `IngredientNotFound` / `NotAnAddOn` for bad add-on selections
/// - `Configuration` when the recipe or add-on pricing is mis-configured
pub fn build_cart_item(
    drink: &Drink,
    base_lines: &[RecipeLine],
    size: &SizeVariant,
    selections: &[AddOnSelection],
    catalog: &CatalogSnapshot,
    quantity: i64,
) -> CoreResult<CartItem> {
    if !drink.is_active {
        return Err(CoreError::DrinkNotFound(drink.id.clone()));
    }
    if size.drink_id != drink.id {
        return Err(CoreError::SizeNotFound {
            drink_id: drink.id.clone(),
            size_id: size.id.clone(),
        });
    }
    check_quantity(quantity)?;

    let mut lines = resolve_lines(base_lines, drink.base_size_ml, size)?;
    let mut add_ons = Vec::with_capacity(selections.len());
    let mut pricing_exact = true;

    for selection in selections {
        let ingredient = catalog
            .ingredient(&selection.ingredient_id)
            .ok_or_else(|| CoreError::IngredientNotFound(selection.ingredient_id.clone()))?;
        if !ingredient.is_selectable_add_on() {
            return Err(CoreError::NotAnAddOn(ingredient.id.clone()));
        }

        let line = selection.to_line();
        let quote = price_line(&line, ingredient, catalog.pricing_rows(&ingredient.id))?;
        pricing_exact &= quote.exact;

        add_ons.push(CartAddOn {
            ingredient_id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            amount: line.amount,
            unit: line.unit,
            unit_label: line.unit_label.clone(),
            price_cents: quote.price.cents(),
        });
        lines.push(line);
    }

    let unit_price = size.price()
        + add_ons
            .iter()
            .map(|a| Money::from_cents(a.price_cents))
            .sum::<Money>();
    let nutrition = catalog.nutrition_for(&lines);

    Ok(CartItem {
        id: Uuid::new_v4().to_string(),
        drink_id: drink.id.clone(),
        drink_name: drink.name.clone(),
        size_id: size.id.clone(),
        size_name: size.name.clone(),
        size_ml: size.size_ml,
        lines,
        add_ons,
        size_price_cents: size.price_cents,
        unit_price_cents: unit_price.cents(),
        quantity,
        pricing_exact,
        nutrition,
        added_at: Utc::now(),
    })
}

// =============================================================================
// Cart State
// =============================================================================

/// One session's cart.
///
/// Owned by whoever holds the session; there is no global cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartState {
    pub items: Vec<CartItem>,

    /// When the cart was created or last cleared.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

impl CartState {
    pub fn new() -> Self {
        CartState {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds an item, merging it into an identical configuration if present.
    ///
    /// Returns the id of the item that now holds the quantity.
    pub fn add_item(&mut self, item: CartItem) -> CoreResult<String> {
        check_quantity(item.quantity)?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.same_configuration(&item)) {
            let new_qty = existing.quantity + item.quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            existing.quantity = new_qty;
            return Ok(existing.id.clone());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let id = item.id.clone();
        self.items.push(item);
        Ok(id)
    }

    /// Sets an item's quantity; zero removes it.
    pub fn update_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(item_id);
        }
        check_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::CartItemNotFound(item_id.to_string()))?;
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.id != item_id);

        if self.items.len() == initial_len {
            Err(CoreError::CartItemNotFound(item_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    pub fn item(&self, item_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Number of distinct items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total number of drinks.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Combined nutrition of every drink in the cart.
    pub fn nutrition(&self) -> NutritionSummary {
        self.items
            .iter()
            .map(CartItem::line_nutrition)
            .fold(NutritionSummary::empty(), NutritionSummary::combine)
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal_cents: self.subtotal().cents(),
            pricing_exact: self.items.iter().all(|i| i.pricing_exact),
            nutrition: self.nutrition(),
        }
    }
}

/// Cart totals for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSummary {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub pricing_exact: bool,
    pub nutrition: NutritionSummary,
}

// =============================================================================
// Unit Tests
// =============================================================================
