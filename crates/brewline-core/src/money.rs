//! # Money Module
//!
//! Provides the `Money` type for handling prices, discounts and totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE FLOATS STOP                                                      │
//! │                                                                         │
//! │  Ingredient quantities are measured (12.5 g of cocoa, 0.3 scoop):      │
//! │    grams, milliliters, rates  →  f64                                    │
//! │                                                                         │
//! │  The moment a quantity becomes a price it is rounded ONCE to cents:    │
//! │    12.5 g × 0.8 ¢/g = 10.0 ¢  →  Money(10)                             │
//! │                                                                         │
//! │  From then on, every subtotal, discount and total is integer cents.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use brewline_core::money::Money;
//!
//! let latte = Money::from_cents(450);          // $4.50
//! let two = latte * 2;                         // $9.00
//! let off = two.percentage(10);                // $0.90
//! assert_eq!((two - off).cents(), 810);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// SizeVariant.price_cents ──┐
///                           ├──► CartItem.unit_price ──► Cart.subtotal
/// Add-on PriceQuote ────────┘                                │
///                                                            ▼
///                               Promotion discount ──► Order.total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use brewline_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds a fractional cent amount (from a rate × quantity product)
    /// to whole cents, half away from zero.
    ///
    /// Non-finite input yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use brewline_core::money::Money;
    ///
    /// assert_eq!(Money::from_fractional_cents(10.5).cents(), 11);
    /// assert_eq!(Money::from_fractional_cents(10.49).cents(), 10);
    /// assert_eq!(Money::from_fractional_cents(f64::NAN).cents(), 0);
    /// ```
    pub fn from_fractional_cents(cents: f64) -> Self {
        if !cents.is_finite() {
            return Money::zero();
        }
        Money(cents.round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `pct` percent of this amount, rounded half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * pct + 50) / 100`, widened to i128 so large
    /// subtotals cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use brewline_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(500).percentage(10).cents(), 50);
    /// assert_eq!(Money::from_cents(999).percentage(15).cents(), 150); // 149.85
    /// ```
    pub fn percentage(&self, pct: u32) -> Money {
        let part = (self.0 as i128 * pct as i128 + 50) / 100;
        Money::from_cents(part as i64)
    }

    /// Clamps the value into `0..=ceiling`.
    ///
    /// This is how every discount is bounded by the subtotal it discounts.
    ///
    /// ## Example
    /// ```rust
    /// use brewline_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(30);
    /// assert_eq!(Money::from_cents(50).clamp_to(subtotal).cents(), 30);
    /// assert_eq!(Money::from_cents(-5).clamp_to(subtotal).cents(), 0);
    /// ```
    pub fn clamp_to(&self, ceiling: Money) -> Money {
        let ceiling = ceiling.0.max(0);
        Money(self.0.clamp(0, ceiling))
    }

    /// Subtracts, flooring the result at zero.
    #[inline]
    pub fn saturating_sub_floor(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as `$12.34` (debugging and ops tooling; the storefront
/// formats with the configured currency).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
