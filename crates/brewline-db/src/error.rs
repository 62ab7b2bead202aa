//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── is_transient()? ──► retried with backoff (order-service)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (order-service) ← Serialized for storefront / staff tools    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use brewline_core::error::{TransitionError, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Tracking code collision
    /// - Duplicate catalog id
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Recipe line referencing an unknown ingredient
    /// - Order item referencing an unknown order
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A status update was refused (compare-and-set lost, or the move is
    /// not allowed from the persisted status).
    #[error("Status update refused: {0}")]
    Transition(#[from] TransitionError),

    /// A catalog write carried a value the domain refuses (negative price).
    #[error("Rejected catalog value: {0}")]
    Validation(#[from] ValidationError),

    /// The customer used up the promotion while this order was in flight.
    #[error("Promotion '{code}' can only be used {limit} time(s) per customer")]
    RedemptionLimit { code: String, limit: u32 },

    /// Stored data could not be decoded (bad JSON column, unknown enum text).
    #[error("Invalid stored data in {entity}: {reason}")]
    InvalidData { entity: String, reason: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Database is locked by another writer.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an InvalidData error.
    pub fn invalid_data(entity: impl Into<String>, reason: impl ToString) -> Self {
        DbError::InvalidData {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether retrying the same operation may succeed.
    ///
    /// ```text
    /// transient:  Busy, PoolExhausted, ConnectionFailed, TransactionFailed
    /// permanent:  everything else (constraint, usage cap, bad input, not found, refused)
    /// ```
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_)
                | DbError::PoolExhausted
                | DbError::ConnectionFailed(_)
                | DbError::TransactionFailed(_)
        )
    }
}

/// Column named in a SQLite constraint message, without its table.
///
/// `"UNIQUE constraint failed: orders.tracking_code"` → `"tracking_code"`.
fn constraint_column(message: &str) -> String {
    message
        .rsplit(": ")
        .next()
        .and_then(|target| target.split(',').next())
        .map(|column| column.rsplit('.').next().unwrap_or(column).trim().to_string())
        .filter(|column| !column.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// ```text
/// RowNotFound                      → NotFound
/// Database, ErrorKind::Unique      → UniqueViolation { field: column }
/// Database, ErrorKind::ForeignKey  → ForeignKeyViolation
/// Database, "locked" / "busy"      → Busy          (transient)
/// PoolTimedOut                     → PoolExhausted (transient)
/// PoolClosed, Io                   → ConnectionFailed
/// ColumnDecode                     → InvalidData
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => {
                        DbError::duplicate(constraint_column(message), "unknown")
                    }
                    sqlx::error::ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                        message: message.to_string(),
                    },
                    _ if message.contains("locked") || message.contains("busy") => {
                        DbError::Busy(message.to_string())
                    }
                    _ => DbError::QueryFailed(message.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            sqlx::Error::ColumnDecode { index, source } => {
                DbError::invalid_data(format!("column {}", index), source)
            }

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use brewline_core::OrderStatus;

    #[test]
    fn test_transient_classification() {
        assert!(DbError::PoolExhausted.is_transient());
        assert!(DbError::Busy("database is locked".to_string()).is_transient());
        assert!(!DbError::not_found("Order", "x").is_transient());
        assert!(!DbError::from(TransitionError::Conflict {
            expected: OrderStatus::Pending,
            actual: OrderStatus::Ready,
        })
        .is_transient());
        assert!(!DbError::RedemptionLimit {
            code: "WELCOME10".to_string(),
            limit: 1,
        }
        .is_transient());
    }

    #[test]
    fn test_constraint_column() {
        assert_eq!(
            constraint_column("UNIQUE constraint failed: orders.tracking_code"),
            "tracking_code"
        );
        assert_eq!(
            constraint_column("UNIQUE constraint failed: size_variants.drink_id, size_variants.name"),
            "drink_id"
        );
        assert_eq!(constraint_column("FOREIGN KEY constraint failed"), "unknown");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound { .. }
        ));
    }
}
