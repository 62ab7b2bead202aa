//! # Validation Module
//!
//! Input validation for cart, promotion and checkout requests.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront / staff tool                                                │
//! │  └── format hints, immediate feedback                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  order-service command                                                  │
//! │  └── THIS MODULE: quantities, codes, contact, pickup time               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  SQLite                                                                 │
//! │  └── NOT NULL, UNIQUE, CHECK and foreign key constraints                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use brewline_core::validation::{validate_promotion_code, validate_quantity};
//!
//! validate_quantity(2).unwrap();
//! assert_eq!(validate_promotion_code(" welcome10 ").unwrap(), "WELCOME10");
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::error::ValidationError;
use crate::fulfillment::{normalize_tracking_code, TRACKING_ALPHABET};
use crate::promotion::normalize_code;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a drink quantity (1..=MAX_ITEM_QUANTITY).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a catalog price in cents. Zero is allowed (free extras).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Code Validators
// =============================================================================

/// Validates a promotion code and returns its normalized (upper-case) form.
///
/// ## Rules
/// - 1 to 32 characters after trimming
/// - Letters, digits, hyphens and underscores only
pub fn validate_promotion_code(code: &str) -> ValidationResult<String> {
    let code = normalize_code(code);

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "promotion_code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "promotion_code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "promotion_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code)
}

/// Validates a tracking code and returns its normalized form.
///
/// Hyphens and spaces are ignored, case is folded, and every remaining
/// character must come from the tracking alphabet.
///
/// ## Example
/// ```rust
/// use brewline_core::validation::validate_tracking_code;
///
/// assert_eq!(validate_tracking_code("abcd-2346").unwrap(), "ABCD2346");
/// assert!(validate_tracking_code("O0O0").is_err()); // ambiguous characters
/// ```
pub fn validate_tracking_code(code: &str) -> ValidationResult<String> {
    let code = normalize_tracking_code(code);

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "tracking_code".to_string(),
        });
    }

    if code.len() > 16 {
        return Err(ValidationError::TooLong {
            field: "tracking_code".to_string(),
            max: 16,
        });
    }

    if !code.bytes().all(|b| TRACKING_ALPHABET.contains(&b)) {
        return Err(ValidationError::InvalidFormat {
            field: "tracking_code".to_string(),
            reason: "contains characters that never appear in tracking codes".to_string(),
        });
    }

    Ok(code)
}

// =============================================================================
// Contact Validators
// =============================================================================

/// Validates the name the order is called out under.
pub fn validate_contact_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "contact_name".to_string(),
        });
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "contact_name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a phone number: 7 to 15 digits, with optional `+`, spaces,
/// hyphens, dots and parentheses.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')'));

    if !allowed || !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "contact_phone".to_string(),
            reason: "must be a phone number with 7 to 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Minimal e-mail shape check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let invalid = || ValidationError::InvalidFormat {
        field: "contact_email".to_string(),
        reason: "must be an e-mail address".to_string(),
    };

    if email.len() > 254 || email.contains(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates contact details: a name plus at least one way to reach the
/// customer.
pub fn validate_contact(
    name: &str,
    phone: Option<&str>,
    email: Option<&str>,
) -> ValidationResult<()> {
    validate_contact_name(name)?;

    let phone = phone.map(str::trim).filter(|p| !p.is_empty());
    let email = email.map(str::trim).filter(|e| !e.is_empty());

    if phone.is_none() && email.is_none() {
        return Err(ValidationError::Required {
            field: "contact_phone or contact_email".to_string(),
        });
    }
    if let Some(phone) = phone {
        validate_phone(phone)?;
    }
    if let Some(email) = email {
        validate_email(email)?;
    }

    Ok(())
}

// =============================================================================
// Pickup Time
// =============================================================================

/// Validates a requested pickup time.
///
/// ## Rules
/// - At least `min_lead_minutes` after `now` (drinks take time to make)
/// - At most `max_ahead_hours` after `now`
///
/// ```text
///  now ──── lead ────┬──────────── allowed ────────────┬──►
///                earliest                           latest
/// ```
pub fn validate_pickup_time(
    pickup_at: DateTime<Utc>,
    now: DateTime<Utc>,
    min_lead_minutes: i64,
    max_ahead_hours: i64,
) -> ValidationResult<()> {
    let earliest = now + Duration::minutes(min_lead_minutes);
    let latest = now + Duration::hours(max_ahead_hours);

    if pickup_at < earliest || pickup_at > latest {
        return Err(ValidationError::OutOfRange {
            field: "pickup_minutes_from_now".to_string(),
            min: min_lead_minutes,
            max: max_ahead_hours * 60,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
