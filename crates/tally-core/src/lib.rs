//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of Tally, a small-business inventory ledger.
//! It holds every rule that decides what a sale is worth and whether it may
//! happen, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Presentation (apps/cli, any UI)                │   │
//! │  │    Product form ──► Basket ──► Complete sale ──► Reports        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │  basket   │  │ validation│  │   │
//! │  │   │  Product  │  │ lineProfit│  │  merge    │  │   rules   │  │   │
//! │  │   │   Sale    │  │ saleTotals│  │  snapshot │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                        ┌───────────┐                            │   │
//! │  │                        │  report   │  read-only aggregation     │   │
//! │  │                        └───────────┘                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        Catalog store, ledger store, sale coordinator            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleItem, DiscountRate, ...)
//! - [`pricing`] - Pricing & profit calculator
//! - [`basket`] - Basket accumulation and sale-time snapshots
//! - [`report`] - Aggregation over committed sales
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::pricing::line_profit;
//! use tally_core::DiscountRate;
//!
//! // 4 units bought at 100, sold at 150, with 10% off the sale
//! let profit = line_profit(100.0, 150.0, 4, DiscountRate::from_percentage(10.0));
//! assert!((profit - 140.0).abs() < 1e-9);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod basket;
pub mod error;
pub mod pricing;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use basket::{merge_lines, price_basket, Basket, PricedBasket};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use pricing::SaleTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Products with fewer units than this are flagged as low stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Number of sales shown in the dashboard's "recent sales" panel.
pub const DEFAULT_RECENT_SALES_LIMIT: usize = 5;

/// Upper bound of a sale-level discount, in percent.
pub const MAX_DISCOUNT_PERCENTAGE: f64 = 100.0;
