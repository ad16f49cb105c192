//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │   │  id (i64)       │   │  product_id     │       │
//! │  │  name, category │   │  date           │   │  name snapshot  │       │
//! │  │  wholesale/sell │   │  items[]  ──────┼──►│  price snapshot │       │
//! │  │  stock          │   │  totals, profit │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountRate   │   │   BasketLine    │   │ NewProduct /    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │ ProductPatch    │       │
//! │  │  percent (f64)  │   │  product_id     │   │  write payloads │       │
//! │  │  10.0 = 10%     │   │  quantity       │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pricing
//! A [`SaleItem`] copies the product's name and both prices at the moment the
//! sale is committed. Later edits to the product, or its deletion, never
//! change a recorded sale. `product_id` on the item is a lookup key only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::pricing::{self, SaleTotals};

/// Store-assigned product identifier.
pub type ProductId = i64;

/// Store-assigned sale identifier.
pub type SaleId = i64;

// =============================================================================
// Discount Rate
// =============================================================================

/// Sale-level discount expressed in percent (10.0 = 10%).
///
/// ## Unchecked by Construction
/// The calculator applies whatever it is given. Range policy (0 to 100,
/// finite) is enforced by the sale coordinator through
/// [`crate::validation::validate_discount`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(f64);

impl DiscountRate {
    /// Creates a discount rate from a percentage.
    #[inline]
    pub const fn from_percentage(percentage: f64) -> Self {
        DiscountRate(percentage)
    }

    /// No discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0.0)
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percentage(&self) -> f64 {
        self.0
    }

    /// Returns the rate as a fraction (10% = 0.1).
    #[inline]
    pub fn fraction(&self) -> f64 {
        self.0 / 100.0
    }

    /// Checks if no discount applies.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Store-assigned id, stable for the product's lifetime.
    pub id: ProductId,

    /// Display name (non-empty).
    pub name: String,

    /// Free text, may be empty.
    pub description: String,

    /// Purchase price per unit.
    pub wholesale_price: f64,

    /// Selling price per unit.
    pub selling_price: f64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Category label (non-empty).
    pub category: String,

    /// When the product was created. Immutable.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }

    /// Checks whether the product falls under the low-stock threshold.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock < threshold
    }

    /// Margin earned on one unit sold without discount.
    #[inline]
    pub fn unit_margin(&self) -> f64 {
        self.selling_price - self.wholesale_price
    }

    /// Case-insensitive match of `term` against name or category.
    ///
    /// An empty (or blank) term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term) || self.category.to_lowercase().contains(&term)
    }
}

/// Payload for creating a product. Id and creation time are assigned by
/// the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub wholesale_price: f64,
    pub selling_price: f64,
    pub stock: i64,
    pub category: String,
}

/// Partial update of a product. `None` leaves the field untouched.
///
/// Setting `stock` here is an explicit catalog edit (stock count, restock).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub wholesale_price: Option<f64>,
    pub selling_price: Option<f64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
}

impl ProductPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.wholesale_price.is_none()
            && self.selling_price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
    }

    /// True when the patch touches the stock level.
    pub fn touches_stock(&self) -> bool {
        self.stock.is_some()
    }

    /// Applies the patch to an in-memory product.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.wholesale_price {
            product.wholesale_price = price;
        }
        if let Some(price) = self.selling_price {
            product.selling_price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
    }
}

// =============================================================================
// Basket Line
// =============================================================================

/// One raw (product, quantity) pair proposed by the caller.
///
/// No validity is assumed: the id may not exist and the quantity may be
/// zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BasketLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl BasketLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        BasketLine {
            product_id,
            quantity,
        }
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a committed sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    /// Weak reference to the product (lookup only).
    pub product_id: ProductId,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Units sold (> 0).
    pub quantity: i64,
    /// Wholesale price at time of sale (frozen).
    pub wholesale_price: f64,
    /// Selling price at time of sale (frozen).
    pub selling_price: f64,
    /// selling_price × quantity.
    pub total_price: f64,
}

impl SaleItem {
    /// Freezes the product's current name and prices into a sale line.
    pub fn snapshot(product: &Product, quantity: i64) -> Self {
        SaleItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            wholesale_price: product.wholesale_price,
            selling_price: product.selling_price,
            total_price: product.selling_price * quantity as f64,
        }
    }

    /// Profit of this line under the sale-level discount.
    pub fn profit(&self, discount: DiscountRate) -> f64 {
        pricing::line_profit(
            self.wholesale_price,
            self.selling_price,
            self.quantity,
            discount,
        )
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A fully priced sale that has not been given an id yet.
///
/// Built by the sale coordinator and appended to the ledger as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    pub date: DateTime<Utc>,
    pub items: Vec<SaleItem>,
    pub discount: DiscountRate,
    pub totals: SaleTotals,
}

impl NewSale {
    /// Prices `items` under `discount` and stamps the sale with `date`.
    pub fn priced(date: DateTime<Utc>, items: Vec<SaleItem>, discount: DiscountRate) -> Self {
        let totals = pricing::sale_totals(&items, discount);
        NewSale {
            date,
            items,
            discount,
            totals,
        }
    }

    /// Attaches the ledger-assigned id.
    pub fn into_sale(self, id: SaleId) -> Sale {
        Sale {
            id,
            date: self.date,
            items: self.items,
            total_amount: self.totals.total_amount,
            discount_percentage: self.discount.percentage(),
            discount_amount: self.totals.discount_amount,
            final_amount: self.totals.final_amount,
            profit: self.totals.profit,
        }
    }
}

/// A committed, immutable sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: SaleId,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// Lines in entry order. Non-empty.
    pub items: Vec<SaleItem>,
    /// Σ item.total_price.
    pub total_amount: f64,
    pub discount_percentage: f64,
    /// total_amount × discount_percentage / 100.
    pub discount_amount: f64,
    /// total_amount − discount_amount.
    pub final_amount: f64,
    /// Σ line profit under the sale discount.
    pub profit: f64,
}

impl Sale {
    /// Returns the sale-level discount.
    #[inline]
    pub fn discount_rate(&self) -> DiscountRate {
        DiscountRate::from_percentage(self.discount_percentage)
    }

    /// Total units across all lines.
    pub fn items_sold(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Recomputes totals from the line items.
    pub fn recomputed_totals(&self) -> SaleTotals {
        pricing::sale_totals(&self.items, self.discount_rate())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
