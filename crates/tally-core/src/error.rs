//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Domain failures (not found, stock, faults)     │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── ApiError         - What the user sees (code + message)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → User         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recoverable vs Fatal
//! Validation, not-found and insufficient-stock failures abort a single
//! operation and leave every store untouched; the user can fix the input and
//! retry. A [`CoreError::ConsistencyFault`] means the stock discipline itself
//! broke and is never retried automatically.

use thiserror::Error;

use crate::types::{ProductId, SaleId};

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of domain failures.
///
/// Presentation code switches on this instead of matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: empty basket, bad quantity, empty or negative fields.
    Validation,
    /// A referenced product or sale does not exist.
    NotFound,
    /// Requested quantity exceeds available stock.
    InsufficientStock,
    /// Internal invariant violated; unrecoverable.
    ConsistencyFault,
}

impl ErrorKind {
    /// Returns true for failures the user can correct and retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorKind::ConsistencyFault)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Basket references an id that was never created
    /// - Product was deleted after being put in the basket
    /// - Update/delete of an unknown id
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(SaleId),

    /// Insufficient stock to complete a sale or apply a stock adjustment.
    ///
    /// ## User Workflow
    /// ```text
    /// Basket: Notebook × 4
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Notebook", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Notebook in stock"
    /// ```
    #[error("Insufficient stock for {name} (#{product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: i64,
        requested: i64,
    },

    /// A basket line asked for zero or a negative number of units.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// A committed sale no longer matches the catalog's stock.
    ///
    /// Only reachable if stock serialization is broken. Logged at error
    /// level and never retried.
    #[error("Consistency fault: {reason}")]
    ConsistencyFault { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error into the ledger's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_) | CoreError::SaleNotFound(_) => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvalidQuantity { .. } | CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::ConsistencyFault { .. } => ErrorKind::ConsistencyFault,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store is touched.
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
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// NaN or infinity where a number was expected.
    #[error("{field} must be a number")]
    NotANumber { field: String },

    /// Sale attempted with no lines.
    #[error("Basket is empty")]
    EmptyBasket,
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
