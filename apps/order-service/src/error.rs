//! # API Error Type
//!
//! Unified error type for order service commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Brewline                               │
//! │                                                                         │
//! │  Storefront / staff tool          Rust Backend                          │
//! │  ───────────────────────          ────────────                          │
//! │                                                                         │
//! │  add_to_cart(...)                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::Busy (after retries) ──┐          │  │
//! │  │         │                                            │          │  │
//! │  │         ▼                                            ▼          │  │
//! │  │  Domain Error? ─── CoreError::NotAnAddOn ────────── ApiError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Promotion / Transition refusal ── PromotionError::Expired ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "PROMOTION_EXPIRED", "message": "Promotion 'X' has ..." }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail and returned with a
//! generic message.

use std::fmt;

use brewline_core::{ConfigurationError, CoreError, PromotionError, TransitionError, ValidationError};
use brewline_db::DbError;
use serde::Serialize;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Order not found: K7M2X9PQ"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Database operation failed (500)
    DatabaseError,

    /// Database busy after retries; safe to try again later (503)
    Unavailable,

    /// Business rule refused the request (422)
    BusinessLogic,

    /// Internal server error (500)
    Internal,

    /// Cart operation failed
    CartError,

    /// Catalog data needs an administrator
    ConfigurationError,

    PromotionNotFound,
    PromotionExpired,
    PromotionInactive,
    PromotionThresholdNotMet,
    PromotionUsageExceeded,
    PromotionIneligibleItems,

    /// Requested status move is not allowed
    InvalidTransition,

    /// Order status changed since the caller looked at it
    Conflict,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Creates a cart error.
    pub fn cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::CartError, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Transition(e) => ApiError::from(e),
            DbError::Validation(e) => ApiError::from(e),
            DbError::RedemptionLimit { code, limit } => {
                ApiError::from(PromotionError::UsageExceeded { code, limit })
            }
            DbError::InvalidData { entity, reason } => {
                tracing::error!(entity = %entity, reason = %reason, "Invalid stored data");
                ApiError::new(ErrorCode::DatabaseError, "Stored data is invalid")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::Unavailable, "Database connection failed")
            }
            DbError::Busy(e) => {
                tracing::error!("Database busy after retries: {}", e);
                ApiError::new(ErrorCode::Unavailable, "Database is busy, try again")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::Unavailable, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::IngredientNotFound(id) => ApiError::not_found("Ingredient", &id),
            CoreError::DrinkNotFound(id) => ApiError::not_found("Drink", &id),
            CoreError::SizeNotFound { drink_id, size_id } => ApiError::not_found(
                "Size",
                &format!("{} (drink {})", size_id, drink_id),
            ),
            CoreError::NotAnAddOn(id) => ApiError::validation(format!(
                "Ingredient {} is not an available add-on",
                id
            )),
            CoreError::CartItemNotFound(id) => ApiError::not_found("Cart item", &id),
            e @ (CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }) => ApiError::cart(e.to_string()),
            CoreError::Configuration(e) => ApiError::from(e),
            CoreError::Validation(e) => ApiError::from(e),
            CoreError::Transition(e) => ApiError::from(e),
        }
    }
}

impl From<ConfigurationError> for ApiError {
    fn from(err: ConfigurationError) -> Self {
        tracing::error!(error = %err, "Catalog configuration error");
        ApiError::new(ErrorCode::ConfigurationError, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<PromotionError> for ApiError {
    fn from(err: PromotionError) -> Self {
        let code = match err {
            PromotionError::NotFound { .. } => ErrorCode::PromotionNotFound,
            PromotionError::Expired { .. } => ErrorCode::PromotionExpired,
            PromotionError::Inactive { .. } => ErrorCode::PromotionInactive,
            PromotionError::ThresholdNotMet { .. } => ErrorCode::PromotionThresholdNotMet,
            PromotionError::UsageExceeded { .. } => ErrorCode::PromotionUsageExceeded,
            PromotionError::IneligibleItems { .. } => ErrorCode::PromotionIneligibleItems,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        let code = match err {
            TransitionError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            TransitionError::Conflict { .. } => ErrorCode::Conflict,
        };
        ApiError::new(code, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
