//! # Validation Module
//!
//! Business-rule checks applied before anything reaches storage.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation (CLI / UI)                                      │
//! │  ├── Parsing (numbers, id:qty pairs)                                   │
//! │  └── No trust assumed about the values                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Stores and sale coordinator                                  │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── CHECK (stock >= 0, prices >= 0, quantity > 0)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_name, validate_price};
//!
//! assert!(validate_name("name", "Notebook A5").is_ok());
//! assert!(validate_price("selling_price", -1.0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{DiscountRate, NewProduct, ProductPatch};
use crate::MAX_DISCOUNT_PERCENTAGE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted product name or category.
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required text field (product name, category).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (giveaways, samples).
pub fn validate_price(field: &str, price: f64) -> ValidationResult<()> {
    if !price.is_finite() {
        return Err(ValidationError::NotANumber {
            field: field.to_string(),
        });
    }

    if price < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level set by a catalog edit.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Validates a sale-level discount.
///
/// ## Rules
/// - Finite
/// - Between 0 and 100 inclusive
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_discount;
/// use tally_core::DiscountRate;
///
/// assert!(validate_discount(DiscountRate::from_percentage(100.0)).is_ok());
/// assert!(validate_discount(DiscountRate::from_percentage(100.5)).is_err());
/// ```
pub fn validate_discount(discount: DiscountRate) -> ValidationResult<()> {
    let pct = discount.percentage();

    if !pct.is_finite() {
        return Err(ValidationError::NotANumber {
            field: "discount".to_string(),
        });
    }

    if !(0.0..=MAX_DISCOUNT_PERCENTAGE).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0.0,
            max: MAX_DISCOUNT_PERCENTAGE,
        });
    }

    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates a product creation payload. Every field is checked.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    validate_name("category", &product.category)?;
    validate_price("wholesale_price", product.wholesale_price)?;
    validate_price("selling_price", product.selling_price)?;
    validate_stock(product.stock)
}

/// Validates a partial update. Fields absent from the patch are not checked.
pub fn validate_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_name("name", name)?;
    }
    if let Some(category) = &patch.category {
        validate_name("category", category)?;
    }
    if let Some(price) = patch.wholesale_price {
        validate_price("wholesale_price", price)?;
    }
    if let Some(price) = patch.selling_price {
        validate_price("selling_price", price)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }
    Ok(())
}
