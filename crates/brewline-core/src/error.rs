//! # Error Types
//!
//! Domain-specific error types for brewline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  brewline-core errors (this file)                                      │
//! │  ├── CoreError           - General domain errors (returned as Err)     │
//! │  ├── ConfigurationError  - Catalog data an admin must fix              │
//! │  ├── ValidationError     - Input validation failures                   │
//! │  ├── PromotionError      - Why a code was rejected (returned as DATA)  │
//! │  ├── TransitionError     - Order status update refused                 │
//! │  └── MissingData         - Degraded-estimate marker (never an Err)     │
//! │                                                                         │
//! │  brewline-db errors (separate crate)                                   │
//! │  └── DbError             - Persistence failures (retried by callers)   │
//! │                                                                         │
//! │  order-service errors                                                  │
//! │  └── ApiError            - What the storefront / staff tools see       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recovery Rules
//! - `MissingData` is recovered locally: the computation continues with a
//!   zero contribution and the result is flagged incomplete.
//! - `PromotionError` and `TransitionError` are passed through verbatim so
//!   the caller can render the precise reason.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::{MeasureUnit, OrderStatus, PricingMode};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Ingredient referenced by a request does not exist in the catalog.
    #[error("Ingredient not found: {0}")]
    IngredientNotFound(String),

    /// Drink referenced by a request does not exist or is inactive.
    #[error("Drink not found: {0}")]
    DrinkNotFound(String),

    /// Size variant does not belong to the drink.
    #[error("Size {size_id} not available for drink {drink_id}")]
    SizeNotFound { drink_id: String, size_id: String },

    /// Selected ingredient cannot be sold as an add-on.
    ///
    /// ## When This Occurs
    /// - Ingredient is inactive
    /// - Ingredient does not carry the add-on flag
    #[error("Ingredient {0} is not an available add-on")]
    NotAnAddOn(String),

    /// Cart item id not present in the cart.
    #[error("Cart item not found: {0}")]
    CartItemNotFound(String),

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Catalog data is inconsistent (wraps ConfigurationError).
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Order status update refused (wraps TransitionError).
    #[error("Status transition refused: {0}")]
    Transition(#[from] TransitionError),
}

// =============================================================================
// Configuration Error
// =============================================================================

/// Catalog configuration problems.
///
/// These are never swallowed: a mis-configured pricing row would otherwise
/// silently sell an ingredient for free. They are surfaced to catalog
/// administrators.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigurationError {
    /// Per-unit pricing row bills a different unit than the line uses.
    ///
    /// ## Example
    /// ```text
    /// Pricing row: vanilla-syrup  per_unit  label = "pump"
    /// Cart line:   vanilla-syrup  2 scoop
    ///      │
    ///      ▼
    /// UnitLabelMismatch { expected: "pump", found: "scoop" }
    /// ```
    #[error("Pricing for {ingredient_id} is per '{expected}' but line is measured in '{found}'")]
    UnitLabelMismatch {
        ingredient_id: String,
        expected: String,
        found: String,
    },

    /// Rate-based pricing row has no rate configured.
    #[error("Pricing row {mode} for {ingredient_id} has no rate")]
    MissingRate {
        ingredient_id: String,
        mode: PricingMode,
    },

    /// A drink's base recipe size is zero, negative or not a number.
    #[error("Invalid recipe base size: {size_ml} ml")]
    InvalidBaseSize { size_ml: f64 },

    /// A size variant has a zero, negative or non-numeric volume.
    #[error("Invalid size variant {size_id}: {size_ml} ml")]
    InvalidTargetSize { size_id: String, size_ml: f64 },
}

// =============================================================================
// Missing Data
// =============================================================================

/// A gap in catalog data that forced a degraded estimate.
///
/// Carried inside results (never returned as `Err`) so callers cannot
/// mistake "no data" for a verified zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingData {
    /// Line references an ingredient that is not in the catalog.
    #[error("ingredient {ingredient_id} is missing")]
    Ingredient { ingredient_id: String },

    /// Ingredient has no nutrition row.
    #[error("nutrition for {ingredient_id} is missing")]
    Nutrition { ingredient_id: String },

    /// Ingredient has no pricing row for the requested mode.
    #[error("{mode} pricing for {ingredient_id} is missing")]
    Pricing {
        ingredient_id: String,
        mode: PricingMode,
    },

    /// Density or grams-per-unit needed for the conversion is missing.
    #[error("conversion factor for {ingredient_id} in {unit} is missing")]
    ConversionFactor {
        ingredient_id: String,
        unit: MeasureUnit,
    },
}

// =============================================================================
// Promotion Error
// =============================================================================

/// Why a promotion code was rejected.
///
/// Always returned as data inside a validation/apply result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionError {
    #[error("Promotion code '{code}' not found")]
    NotFound { code: String },

    /// Active window has ended.
    #[error("Promotion '{code}' has expired")]
    Expired { code: String },

    /// Switched off by an administrator, or its window has not opened yet.
    #[error("Promotion '{code}' is not active")]
    Inactive { code: String },

    /// Subtotal below the promotion's minimum.
    #[error("Promotion '{code}' requires a subtotal of at least {required_cents} cents")]
    ThresholdNotMet {
        code: String,
        required_cents: i64,
        subtotal_cents: i64,
    },

    /// Customer already redeemed the promotion the maximum number of times.
    #[error("Promotion '{code}' can only be used {limit} time(s) per customer")]
    UsageExceeded { code: String, limit: u32 },

    /// Cart does not contain what the promotion needs.
    #[error("Promotion '{code}' does not apply to this cart: {reason}")]
    IneligibleItems { code: String, reason: String },
}

impl PromotionError {
    /// Machine-readable sub-kind, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            PromotionError::NotFound { .. } => "not_found",
            PromotionError::Expired { .. } => "expired",
            PromotionError::Inactive { .. } => "inactive",
            PromotionError::ThresholdNotMet { .. } => "threshold_not_met",
            PromotionError::UsageExceeded { .. } => "usage_exceeded",
            PromotionError::IneligibleItems { .. } => "ineligible_items",
        }
    }
}

// =============================================================================
// Transition Error
// =============================================================================

/// Order status update refusals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionError {
    /// Backward move, self-transition, or leaving a terminal state.
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Persisted status changed since the caller last observed it.
    ///
    /// ## User Workflow
    /// ```text
    /// Barista A sees: pending          Barista B sees: pending
    ///      │                                 │
    ///      ▼                                 │
    /// pending → in_progress ✓               │
    ///                                        ▼
    ///                          pending → cancelled
    ///                                        │
    ///                                        ▼
    ///             Conflict { expected: pending, actual: in_progress }
    /// ```
    #[error("Order status changed: expected {expected}, found {actual}")]
    Conflict {
        expected: OrderStatus,
        actual: OrderStatus,
    },
}

impl TransitionError {
    /// Machine-readable sub-kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TransitionError::InvalidTransition { .. } => "invalid_transition",
            TransitionError::Conflict { .. } => "conflict",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed tracking code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_error_kinds() {
        let err = PromotionError::UsageExceeded {
            code: "WELCOME".to_string(),
            limit: 1,
        };
        assert_eq!(err.kind(), "usage_exceeded");
        assert_eq!(
            err.to_string(),
            "Promotion 'WELCOME' can only be used 1 time(s) per customer"
        );
    }

    #[test]
    fn test_promotion_error_serializes_kind_tag() {
        let err = PromotionError::Expired {
            code: "SUMMER".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "expired");
        assert_eq!(json["code"], "SUMMER");
    }

    #[test]
    fn test_transition_error_messages() {
        let err = TransitionError::InvalidTransition {
            from: OrderStatus::PickedUp,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(err.to_string(), "Cannot move order from picked_up to pending");
    }

    #[test]
    fn test_configuration_converts_to_core_error() {
        let err = ConfigurationError::UnitLabelMismatch {
            ingredient_id: "syrup".to_string(),
            expected: "pump".to_string(),
            found: "scoop".to_string(),
        };
        let core_err: CoreError = err.into();
        assert!(matches!(core_err, CoreError::Configuration(_)));
    }
}
