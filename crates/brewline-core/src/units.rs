//! # Unit Normalizer
//!
//! Converts heterogeneous ingredient amounts into grams (and milliliters).
//!
//! ## Conversion Table
//! ```text
//! ┌───────────────┬──────────────────────────────┬─────────────────────────┐
//! │ Input unit    │ grams                        │ factor missing          │
//! ├───────────────┼──────────────────────────────┼─────────────────────────┤
//! │ gram          │ amount                       │ (never missing)         │
//! │ milliliter    │ amount × density (g/ml)      │ amount, exact = false   │
//! │ scoop / piece │ amount × grams_per_unit      │ amount, exact = false   │
//! └───────────────┴──────────────────────────────┴─────────────────────────┘
//! ```
//!
//! Conversion never fails. A missing factor degrades to a 1:1 estimate and
//! the result says so through `exact`. Negative, NaN and infinite amounts
//! become zero so every downstream total stays non-negative.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::MissingData;
use crate::types::{Ingredient, MeasureUnit};

/// A normalized quantity and whether it was computed from real factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity {
    pub value: f64,
    pub exact: bool,
}

impl Quantity {
    #[inline]
    fn exact(value: f64) -> Self {
        Quantity { value, exact: true }
    }

    #[inline]
    fn estimated(value: f64) -> Self {
        Quantity {
            value,
            exact: false,
        }
    }
}

/// Amounts that cannot describe a real quantity count as zero.
#[inline]
pub fn clamp_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// Returns a usable positive conversion factor, if any.
#[inline]
fn factor(value: Option<f64>) -> Option<f64> {
    value.filter(|f| f.is_finite() && *f > 0.0)
}

/// Converts `amount` of `unit` into grams for `ingredient`.
///
/// ## Example
/// ```rust
/// use brewline_core::units::to_grams;
/// use brewline_core::types::{Ingredient, MeasureUnit};
///
/// let milk = Ingredient {
///     id: "milk".into(),
///     name: "Whole milk".into(),
///     default_unit: MeasureUnit::Milliliter,
///     grams_per_unit: None,
///     density_g_per_ml: Some(1.03),
///     allergens: Default::default(),
///     is_active: true,
///     is_add_on: false,
/// };
/// let q = to_grams(200.0, MeasureUnit::Milliliter, &milk);
/// assert!((q.value - 206.0).abs() < 1e-9);
/// assert!(q.exact);
/// ```
pub fn to_grams(amount: f64, unit: MeasureUnit, ingredient: &Ingredient) -> Quantity {
    let amount = clamp_amount(amount);
    match unit {
        MeasureUnit::Gram => Quantity::exact(amount),
        MeasureUnit::Milliliter => match factor(ingredient.density_g_per_ml) {
            Some(density) => Quantity::exact(amount * density),
            None => Quantity::estimated(amount),
        },
        MeasureUnit::Scoop | MeasureUnit::Piece => match factor(ingredient.grams_per_unit) {
            Some(per_unit) => Quantity::exact(amount * per_unit),
            None => Quantity::estimated(amount),
        },
    }
}

/// Converts `amount` of `unit` into milliliters for `ingredient`.
///
/// Mirror image of [`to_grams`], used by per-milliliter pricing:
/// - milliliter: amount
/// - gram: amount ÷ density
/// - scoop / piece: amount × grams_per_unit ÷ density
///
/// Each missing factor degrades to a 1:1 step and clears `exact`.
pub fn to_milliliters(amount: f64, unit: MeasureUnit, ingredient: &Ingredient) -> Quantity {
    let amount = clamp_amount(amount);
    let density = factor(ingredient.density_g_per_ml);
    match unit {
        MeasureUnit::Milliliter => Quantity::exact(amount),
        MeasureUnit::Gram => match density {
            Some(d) => Quantity::exact(amount / d),
            None => Quantity::estimated(amount),
        },
        MeasureUnit::Scoop | MeasureUnit::Piece => {
            let grams = to_grams(amount, unit, ingredient);
            match density {
                Some(d) => Quantity {
                    value: grams.value / d,
                    exact: grams.exact,
                },
                None => Quantity::estimated(grams.value),
            }
        }
    }
}

/// Names the factor a conversion lacked, for data-gap reporting.
///
/// Returns `None` when `unit` needs no factor or the factor is present.
pub fn missing_factor(unit: MeasureUnit, ingredient: &Ingredient) -> Option<MissingData> {
    let present = match unit {
        MeasureUnit::Gram => true,
        MeasureUnit::Milliliter => factor(ingredient.density_g_per_ml).is_some(),
        MeasureUnit::Scoop | MeasureUnit::Piece => factor(ingredient.grams_per_unit).is_some(),
    };
    if present {
        None
    } else {
        Some(MissingData::ConversionFactor {
            ingredient_id: ingredient.id.clone(),
            unit,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
