//! # Recipe Scaler
//!
//! Derives the ingredient lines for one size of a drink.
//!
//! ```text
//!                 ┌───────────────────────┐
//!  SizeVariant ──►│ override lines set?   │── yes ──► lines returned as-is
//!                 └──────────┬────────────┘
//!                            │ no
//!                            ▼
//!        base lines × (size_ml / base_size_ml), rounded to 0.1
//! ```
//!
//! Scaling always starts from the base recipe. A scaled list is never fed
//! back in, so rounding error cannot compound across sizes.

use crate::error::ConfigurationError;
use crate::types::{RecipeLine, SizeVariant};
use crate::SCALE_DECIMALS;

/// Rounds `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn valid_volume(ml: f64) -> bool {
    ml.is_finite() && ml > 0.0
}

/// Resolves the concrete lines for `target`.
///
/// ## Errors
/// - [`ConfigurationError::InvalidBaseSize`] when the base recipe size is
///   not a positive number (and the size has no override list).
/// - [`ConfigurationError::InvalidTargetSize`] when the target volume is
///   not a positive number (and the size has no override list).
///
/// ## Example
/// ```rust
/// use brewline_core::recipe::resolve_lines;
/// use brewline_core::types::{MeasureUnit, RecipeLine, SizeVariant};
///
/// let base = vec![RecipeLine::new("espresso", 18.0, MeasureUnit::Gram)];
/// let large = SizeVariant {
///     id: "latte-l".into(),
///     drink_id: "latte".into(),
///     name: "Large".into(),
///     size_ml: 470.0,
///     price_cents: 575,
///     override_lines: None,
/// };
/// let lines = resolve_lines(&base, 350.0, &large).unwrap();
/// assert_eq!(lines[0].amount, 24.2); // 18 × 470 / 350 = 24.17
/// ```
pub fn resolve_lines(
    base_lines: &[RecipeLine],
    base_size_ml: f64,
    target: &SizeVariant,
) -> Result<Vec<RecipeLine>, ConfigurationError> {
    if let Some(lines) = &target.override_lines {
        return Ok(lines.clone());
    }

    if !valid_volume(base_size_ml) {
        return Err(ConfigurationError::InvalidBaseSize {
            size_ml: base_size_ml,
        });
    }
    if !valid_volume(target.size_ml) {
        return Err(ConfigurationError::InvalidTargetSize {
            size_id: target.id.clone(),
            size_ml: target.size_ml,
        });
    }

    let ratio = target.size_ml / base_size_ml;
    Ok(base_lines
        .iter()
        .map(|line| RecipeLine {
            amount: round_to(line.amount * ratio, SCALE_DECIMALS),
            ..line.clone()
        })
        .collect())
}

// =============================================================================
// Unit Tests
// =============================================================================
