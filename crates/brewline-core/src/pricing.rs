//! # Ingredient Pricing Resolver
//!
//! Computes the cost contribution of an ingredient amount.
//!
//! ## Modes
//! ```text
//! ┌────────────────┬────────────────────────────────────────────────────────┐
//! │ flat           │ base price, independent of amount                     │
//! │ per_gram       │ to_grams(amount, unit) × rate                         │
//! │ per_milliliter │ to_milliliters(amount, unit) × rate                   │
//! │ per_unit       │ amount × rate  (line label must equal row label)      │
//! └────────────────┴────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//! - No row for the mode → zero cents plus a [`MissingData::Pricing`] gap.
//!   The caller still gets a number; the quote tells it not to trust it.
//! - Label mismatch or a rate mode without a rate → [`ConfigurationError`].
//!   Those are catalog bugs and must reach an administrator.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::CatalogSnapshot;
use crate::error::{ConfigurationError, MissingData};
use crate::money::Money;
use crate::types::{Ingredient, IngredientPricing, MeasureUnit, PricingMode, RecipeLine};
use crate::units::{clamp_amount, missing_factor, to_grams, to_milliliters, Quantity};

// =============================================================================
// Price Quote
// =============================================================================

/// A resolved price and how much to trust it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    pub price: Money,

    /// False when a conversion factor was missing and the quantity estimated.
    pub exact: bool,

    /// Set when the price is a degraded zero (or estimate).
    pub gap: Option<MissingData>,
}

impl PriceQuote {
    fn exact(price: Money) -> Self {
        PriceQuote {
            price,
            exact: true,
            gap: None,
        }
    }

    fn missing(gap: MissingData) -> Self {
        PriceQuote {
            price: Money::zero(),
            exact: false,
            gap: Some(gap),
        }
    }
}

/// Sum of several line quotes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LinesPrice {
    pub total: Money,
    pub exact: bool,
    pub gaps: Vec<MissingData>,
}

// =============================================================================
// Resolution
// =============================================================================

fn row_for(rows: &[IngredientPricing], mode: PricingMode) -> Option<&IngredientPricing> {
    rows.iter().find(|row| row.mode == mode)
}

fn labels_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Prices `amount` of `unit` in `mode`, labelling per-unit lines with the
/// unit's own name.
pub fn price_for(
    ingredient: &Ingredient,
    rows: &[IngredientPricing],
    amount: f64,
    unit: MeasureUnit,
    mode: PricingMode,
) -> Result<PriceQuote, ConfigurationError> {
    price_labeled(ingredient, rows, amount, unit, mode, unit.label())
}

/// Prices `amount` of `unit` in `mode` with an explicit line label.
///
/// The label only matters for `per_unit` rows. A row without its own label
/// bills the ingredient's default unit.
pub fn price_labeled(
    ingredient: &Ingredient,
    rows: &[IngredientPricing],
    amount: f64,
    unit: MeasureUnit,
    mode: PricingMode,
    line_label: &str,
) -> Result<PriceQuote, ConfigurationError> {
    let Some(row) = row_for(rows, mode) else {
        return Ok(PriceQuote::missing(MissingData::Pricing {
            ingredient_id: ingredient.id.clone(),
            mode,
        }));
    };

    let quantity = match mode {
        PricingMode::Flat => return Ok(PriceQuote::exact(row.base_price())),
        PricingMode::PerGram => to_grams(amount, unit, ingredient),
        PricingMode::PerMilliliter => to_milliliters(amount, unit, ingredient),
        PricingMode::PerUnit => {
            let expected = row
                .unit_label
                .as_deref()
                .unwrap_or(ingredient.default_unit.label());
            if !labels_match(expected, line_label) {
                return Err(ConfigurationError::UnitLabelMismatch {
                    ingredient_id: ingredient.id.clone(),
                    expected: expected.to_string(),
                    found: line_label.to_string(),
                });
            }
            // Counted units are billed as counted, no conversion involved.
            Quantity {
                value: clamp_amount(amount),
                exact: true,
            }
        }
    };

    let rate = row.rate().ok_or_else(|| ConfigurationError::MissingRate {
        ingredient_id: ingredient.id.clone(),
        mode,
    })?;

    // Per-milliliter conversions from grams lack density, not a unit factor.
    let gap = if quantity.exact {
        None
    } else {
        missing_factor(unit, ingredient)
            .or_else(|| missing_factor(MeasureUnit::Milliliter, ingredient))
    };

    Ok(PriceQuote {
        price: rate.charge(quantity.value),
        exact: quantity.exact,
        gap,
    })
}

/// Picks the mode a line is billed in.
///
/// The unit's natural mode wins when a row exists for it; otherwise a flat
/// row is used. With neither, the natural mode is returned so the quote
/// reports the gap against it.
pub fn select_mode(rows: &[IngredientPricing], unit: MeasureUnit) -> PricingMode {
    let natural = PricingMode::natural_for(unit);
    if row_for(rows, natural).is_some() {
        natural
    } else if row_for(rows, PricingMode::Flat).is_some() {
        PricingMode::Flat
    } else {
        natural
    }
}

/// Prices a single recipe line in its selected mode.
pub fn price_line(
    line: &RecipeLine,
    ingredient: &Ingredient,
    rows: &[IngredientPricing],
) -> Result<PriceQuote, ConfigurationError> {
    let mode = select_mode(rows, line.unit);
    price_labeled(
        ingredient,
        rows,
        line.amount,
        line.unit,
        mode,
        line.effective_label(),
    )
}

/// Prices several lines against a catalog snapshot and sums the result.
///
/// Lines referencing unknown ingredients contribute zero and a gap.
pub fn price_lines(
    lines: &[RecipeLine],
    catalog: &CatalogSnapshot,
) -> Result<LinesPrice, ConfigurationError> {
    let mut result = LinesPrice {
        total: Money::zero(),
        exact: true,
        gaps: Vec::new(),
    };

    for line in lines {
        let Some(ingredient) = catalog.ingredient(&line.ingredient_id) else {
            result.exact = false;
            push_gap(
                &mut result.gaps,
                MissingData::Ingredient {
                    ingredient_id: line.ingredient_id.clone(),
                },
            );
            continue;
        };

        let quote = price_line(line, ingredient, catalog.pricing_rows(&ingredient.id))?;
        result.total += quote.price;
        result.exact &= quote.exact;
        if let Some(gap) = quote.gap {
            push_gap(&mut result.gaps, gap);
        }
    }

    Ok(result)
}

fn push_gap(gaps: &mut Vec<MissingData>, gap: MissingData) {
    if !gaps.contains(&gap) {
        gaps.push(gap);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
