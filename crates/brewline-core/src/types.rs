//! # Domain Types
//!
//! Catalog and order records used throughout Brewline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  CATALOG (read-only to the core)                                       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Ingredient    │   │ IngredientNutr. │   │ IngredientPric. │       │
//! │  │  default_unit   │   │  per_100g       │   │  mode (1 row    │       │
//! │  │  density g/ml   │   │  (Macros)       │   │   per mode)     │       │
//! │  │  grams_per_unit │   └─────────────────┘   │  base / rate    │       │
//! │  │  allergens      │                         └─────────────────┘       │
//! │  └─────────────────┘                                                   │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Drink       │──►│   SizeVariant   │   │   RecipeLine    │       │
//! │  │  base_size_ml   │   │  size_ml, price │   │  amount + unit  │       │
//! │  └─────────────────┘   │  override lines │   │  role base/extra│       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ORDERS (written once at checkout, status mutated by staff)            │
//! │  Order ──► OrderItem ──► OrderItemIngredient                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::nutrition::Macros;

// =============================================================================
// Measure Unit
// =============================================================================

/// The unit an ingredient amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MeasureUnit {
    Gram,
    Milliliter,
    /// A measuring scoop; converted through grams-per-unit.
    Scoop,
    /// A discrete piece (ice cube, marshmallow, pearl portion).
    Piece,
}

impl MeasureUnit {
    /// Label used for display and per-unit pricing label checks.
    pub const fn label(&self) -> &'static str {
        match self {
            MeasureUnit::Gram => "gram",
            MeasureUnit::Milliliter => "milliliter",
            MeasureUnit::Scoop => "scoop",
            MeasureUnit::Piece => "piece",
        }
    }

    /// True for units converted via grams-per-unit.
    pub const fn is_discrete(&self) -> bool {
        matches!(self, MeasureUnit::Scoop | MeasureUnit::Piece)
    }
}

impl fmt::Display for MeasureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MeasureUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "g" | "gram" | "grams" => Ok(MeasureUnit::Gram),
            "ml" | "milliliter" | "milliliters" => Ok(MeasureUnit::Milliliter),
            "scoop" | "scoops" => Ok(MeasureUnit::Scoop),
            "piece" | "pieces" | "pc" => Ok(MeasureUnit::Piece),
            other => Err(ValidationError::InvalidFormat {
                field: "unit".to_string(),
                reason: format!("unknown unit '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Ingredient
// =============================================================================

/// An ingredient in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ingredient {
    pub id: String,
    pub name: String,

    /// Unit the catalog normally measures this ingredient in.
    pub default_unit: MeasureUnit,

    /// Grams per scoop/piece. Absent → discrete units degrade to an estimate.
    pub grams_per_unit: Option<f64>,

    /// Density in g/ml. Absent → milliliters degrade to an estimate.
    pub density_g_per_ml: Option<f64>,

    /// Allergen tags ("milk", "soy", "tree_nut", ...).
    pub allergens: BTreeSet<String>,

    /// Whether the ingredient can currently be used (soft delete).
    pub is_active: bool,

    /// Whether customers may add the ingredient as a paid extra.
    pub is_add_on: bool,
}

impl Ingredient {
    /// True when the ingredient may be selected as an add-on right now.
    pub fn is_selectable_add_on(&self) -> bool {
        self.is_active && self.is_add_on
    }
}

/// Per-100g nutrition for one ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IngredientNutrition {
    pub ingredient_id: String,
    pub per_100g: Macros,
}

// =============================================================================
// Pricing
// =============================================================================

/// The billing basis for an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Fixed fee regardless of amount.
    Flat,
    PerGram,
    PerMilliliter,
    /// Per discrete unit; the line's unit label must match the row's.
    PerUnit,
}

impl PricingMode {
    /// The mode a line measured in `unit` is naturally billed in.
    pub const fn natural_for(unit: MeasureUnit) -> Self {
        match unit {
            MeasureUnit::Gram => PricingMode::PerGram,
            MeasureUnit::Milliliter => PricingMode::PerMilliliter,
            MeasureUnit::Scoop | MeasureUnit::Piece => PricingMode::PerUnit,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PricingMode::Flat => "flat",
            PricingMode::PerGram => "per_gram",
            PricingMode::PerMilliliter => "per_milliliter",
            PricingMode::PerUnit => "per_unit",
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rate in hundredths of a cent per unit of measure.
///
/// ## Why Hundredths?
/// Espresso costs fractions of a cent per gram. Storing the rate as an
/// integer keeps catalog data exact; the product with a measured quantity
/// is rounded once to whole cents.
///
/// ```text
/// 80 = 0.80 ¢ per gram
/// 18 g × 0.80 ¢ = 14.4 ¢ → 14 ¢
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitRate(i64);

impl UnitRate {
    #[inline]
    pub const fn from_centicents(centicents: i64) -> Self {
        UnitRate(centicents)
    }

    #[inline]
    pub const fn centicents(&self) -> i64 {
        self.0
    }

    /// Prices `quantity` units at this rate.
    pub fn charge(&self, quantity: f64) -> Money {
        Money::from_fractional_cents(quantity * self.0 as f64 / 100.0)
    }
}

/// One pricing row for an ingredient (at most one per mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct IngredientPricing {
    pub ingredient_id: String,
    pub mode: PricingMode,

    /// Flat fee in cents (used by `Flat`).
    pub base_price_cents: i64,

    /// Rate in hundredths of a cent per unit (rate modes).
    pub rate_centicents: Option<i64>,

    /// Unit label billed by `PerUnit` rows ("pump", "shot", "scoop").
    pub unit_label: Option<String>,
}

impl IngredientPricing {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    #[inline]
    pub fn rate(&self) -> Option<UnitRate> {
        self.rate_centicents.map(UnitRate::from_centicents)
    }
}

// =============================================================================
// Recipes
// =============================================================================

/// Whether a line is part of the drink or an extra on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    #[default]
    Base,
    Extra,
}

/// An ingredient amount within a recipe or cart item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RecipeLine {
    pub ingredient_id: String,
    pub amount: f64,
    pub unit: MeasureUnit,
    #[serde(default)]
    pub role: LineRole,

    /// Custom unit label ("pump", "shot") for per-unit pricing.
    /// Falls back to the unit's own label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_label: Option<String>,
}

impl RecipeLine {
    /// Creates a base line with the unit's own label.
    pub fn new(ingredient_id: impl Into<String>, amount: f64, unit: MeasureUnit) -> Self {
        RecipeLine {
            ingredient_id: ingredient_id.into(),
            amount,
            unit,
            role: LineRole::Base,
            unit_label: None,
        }
    }

    /// Marks the line as an extra.
    pub fn extra(mut self) -> Self {
        self.role = LineRole::Extra;
        self
    }

    /// Sets a custom unit label.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.unit_label = Some(label.into());
        self
    }

    /// Label compared against per-unit pricing rows.
    pub fn effective_label(&self) -> &str {
        self.unit_label.as_deref().unwrap_or(self.unit.label())
    }
}

/// A drink on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Drink {
    pub id: String,
    pub name: String,

    /// Volume the base recipe lines are written for.
    pub base_size_ml: f64,

    pub is_active: bool,
}

/// A named serving size of a drink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SizeVariant {
    pub id: String,
    pub drink_id: String,
    pub name: String,
    pub size_ml: f64,

    /// Sale price of the drink in this size (base lines included).
    pub price_cents: i64,

    /// Explicit line list replacing the scaled base recipe.
    pub override_lines: Option<Vec<RecipeLine>>,
}

impl SizeVariant {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfillment status of an order.
///
/// Transition rules live in [`crate::fulfillment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Ready,
    PickedUp,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Ready,
        OrderStatus::PickedUp,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Ready => "ready",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown order status '{}'", s),
            })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "TEXT", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid at the counter on pickup.
    PayAtPickup,
    /// Card payment captured by an external processor.
    Card,
    /// Mobile wallet captured by an external processor.
    Wallet,
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pay_at_pickup" | "cash" | "counter" => Ok(PaymentMethod::PayAtPickup),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "wallet" | "apple_pay" | "google_pay" => Ok(PaymentMethod::Wallet),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("unknown payment method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,

    /// Customer-facing code for unauthenticated status lookups.
    pub tracking_code: String,

    pub status: OrderStatus,
    pub customer_id: Option<String>,
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,

    #[ts(as = "String")]
    pub pickup_at: DateTime<Utc>,

    pub payment_method: PaymentMethod,

    /// Processor reference (authorization id, wallet token id).
    pub payment_reference: Option<String>,

    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,

    pub promotion_id: Option<String>,
    pub promotion_code: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A drink line of an order. Snapshot pattern: names and prices are frozen.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub drink_id: String,
    pub drink_name_snapshot: String,
    pub size_name_snapshot: String,
    pub size_ml: f64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,

    /// Nutrition for the whole line (unit nutrition × quantity).
    pub nutrition: Macros,

    /// False when catalog data was missing while computing `nutrition`.
    pub nutrition_complete: bool,
}

/// One ingredient line of an ordered drink.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItemIngredient {
    pub id: String,
    pub order_item_id: String,
    pub ingredient_id: String,
    pub ingredient_name_snapshot: String,
    pub amount: f64,
    pub unit: MeasureUnit,
    pub role: LineRole,

    /// Normalized weight of one drink's worth of this line.
    pub grams: f64,

    /// Charged price for extras; zero for base lines (included in size price).
    pub price_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
