//! # brewline-core: Valuation and Fulfillment Logic for Brewline
//!
//! Everything that turns recipes into grams, nutrition and prices, decides
//! discounts, and governs the order lifecycle lives here as pure functions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Brewline Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Storefront / staff tools (external)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/order-service                              │   │
//! │  │    cart, promotion, checkout, tracking, status commands         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ brewline-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   recipe ──► units ──► nutrition ──┐                            │   │
//! │  │                  └───► pricing ────┼──► cart ──► promotion      │   │
//! │  │                                    │                            │   │
//! │  │                              fulfillment (order lifecycle)      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 brewline-db (Database Layer)                    │   │
//! │  │        SQLite catalog, promotions, orders, migrations           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Unit Normalizer: amounts → grams / milliliters
//! - [`nutrition`] - Nutrition Aggregator: per-100g rows → totals + allergens
//! - [`pricing`] - Ingredient Pricing Resolver: flat / per-gram / per-ml / per-unit
//! - [`recipe`] - Recipe Scaler: base recipe → size-specific lines
//! - [`cart`] - Session cart built from the four above
//! - [`promotion`] - Promotion Engine: validate + apply, non-stacking
//! - [`fulfillment`] - Order status state machine and tracking codes
//! - [`money`], [`types`], [`error`], [`validation`], [`catalog`]
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output
//! 2. **Degrade, Don't Fail**: missing catalog data yields a flagged estimate
//! 3. **Integer Money**: measured quantities are f64, prices are cents
//! 4. **Explicit Errors**: typed errors, returned as values, never panics
//!
//! ## Example Usage
//!
//! ```rust
//! use brewline_core::money::Money;
//! use brewline_core::fulfillment::check_transition;
//! use brewline_core::types::OrderStatus;
//!
//! let subtotal = Money::from_cents(500);
//! assert_eq!(subtotal.percentage(10).cents(), 50);
//!
//! assert!(check_transition(OrderStatus::Pending, OrderStatus::Pending, OrderStatus::InProgress).is_ok());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod error;
pub mod fulfillment;
pub mod money;
pub mod nutrition;
pub mod pricing;
pub mod promotion;
pub mod recipe;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{AddOnSelection, CartItem, CartState, CartSummary};
pub use catalog::CatalogSnapshot;
pub use error::{
    ConfigurationError, CoreError, CoreResult, MissingData, PromotionError, TransitionError,
    ValidationError,
};
pub use money::Money;
pub use nutrition::{Macros, NutritionSummary};
pub use promotion::{Promotion, PromotionKind, PromotionOutcome, PromotionValidation};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct items in a single cart.
pub const MAX_CART_ITEMS: usize = 50;

/// Maximum quantity of one configured drink.
///
/// ## Business Reason
/// Catches fat-finger orders (50 instead of 5) before the bar sees them.
pub const MAX_ITEM_QUANTITY: i64 = 99;

/// Decimal places scaled recipe amounts are rounded to.
pub const SCALE_DECIMALS: u32 = 1;

/// Default tracking code length.
pub const TRACKING_CODE_LENGTH: usize = 8;
