//! # API Error Type
//!
//! The one error type command functions return. It is what a user sees.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally                                  │
//! │                                                                         │
//! │  Command Function -> Result<T, ApiError>                                │
//! │         │                                                               │
//! │         ├── CoreError::Validation / InvalidQuantity ─► VALIDATION_ERROR │
//! │         ├── CoreError::*NotFound                    ─► NOT_FOUND        │
//! │         ├── CoreError::InsufficientStock            ─► INSUFFICIENT_STOCK│
//! │         ├── CoreError::ConsistencyFault             ─► CONSISTENCY_FAULT│
//! │         ├── DbError::{Query,Transaction,...}        ─► DATABASE_ERROR   │
//! │         │       (details logged, generic message returned)             │
//! │         └── ConfigError                             ─► CONFIG_ERROR     │
//! │                                                                         │
//! │  --json:  {"code": "NOT_FOUND", "message": "Product not found: 12"}    │
//! │  text:    error: Product not found: 12                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::CoreError;
use tally_db::DbError;

use crate::config::ConfigError;

/// Error returned from command functions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced product or sale does not exist
    NotFound,

    /// Malformed input (including unparseable arguments)
    ValidationError,

    /// Requested quantity exceeds available stock
    InsufficientStock,

    /// Ledger and catalog disagree; needs a human
    ConsistencyFault,

    /// Storage failed
    DatabaseError,

    /// Configuration could not be loaded or saved
    ConfigError,

    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Process exit code for the `tally` binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::ValidationError => 2,
            ErrorCode::NotFound => 3,
            ErrorCode::InsufficientStock => 4,
            ErrorCode::ConsistencyFault => 70,
            ErrorCode::DatabaseError | ErrorCode::ConfigError | ErrorCode::Internal => 1,
        }
    }
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
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
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
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again")
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
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", id),
            CoreError::InsufficientStock {
                name,
                available,
                requested,
                ..
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Not enough {} in stock: {} available, {} requested",
                    name, available, requested
                ),
            ),
            CoreError::InvalidQuantity {
                product_id,
                quantity,
            } => ApiError::validation(format!(
                "Quantity for product {} must be positive, got {}",
                product_id, quantity
            )),
            CoreError::ConsistencyFault { reason } => {
                tracing::error!(%reason, "Consistency fault surfaced to user");
                ApiError::new(
                    ErrorCode::ConsistencyFault,
                    format!("Inventory consistency fault, nothing was saved: {}", reason),
                )
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(format!("Failed to encode output: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(format!("I/O error: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ValidationError;

    #[test]
    fn test_domain_errors_keep_their_code() {
        let err: ApiError = DbError::from(CoreError::ProductNotFound(12)).into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Product not found: 12");

        let err: ApiError = CoreError::InsufficientStock {
            product_id: 1,
            name: "Notebook".to_string(),
            available: 3,
            requested: 4,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Not enough Notebook in stock: 3 available, 4 requested");

        let err: ApiError = DbError::from(ValidationError::EmptyBasket).into();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_consistency_fault_is_distinct() {
        let err: ApiError = CoreError::ConsistencyFault {
            reason: "stock drift".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ConsistencyFault);
        assert_ne!(err.code.exit_code(), ErrorCode::InsufficientStock.exit_code());
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err: ApiError = DbError::QueryFailed("no such column: secret".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("secret"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&ApiError::not_found("Sale", 9)).unwrap();
        assert_eq!(json, r#"{"code":"NOT_FOUND","message":"Sale not found: 9"}"#);
    }
}
