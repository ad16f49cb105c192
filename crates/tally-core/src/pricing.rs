//! # Pricing & Profit Calculator
//!
//! Pure functions turning sale lines and a sale-level discount into totals.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sale Totals Calculation                         │
//! │                                                                         │
//! │  Line items                                                             │
//! │  ┌────────────────────────────────────────┐                            │
//! │  │ Notebook   150.00 × 4 = 600.00         │                            │
//! │  │ Pen         20.00 × 5 = 100.00         │                            │
//! │  └────────────────────────────────────────┘                            │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │  total_amount    = Σ total_price                        = 700.00       │
//! │  discount_amount = total_amount × pct / 100   (10%)     =  70.00       │
//! │  final_amount    = total_amount − discount_amount       = 630.00       │
//! │  profit          = Σ line_profit(item, pct)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Numeric Semantics
//! All amounts are `f64` and nothing is rounded here. Rounding happens only
//! when a value is formatted for display.
//!
//! The discount is applied as given. A percentage outside `[0, 100]` yields
//! a negative discount or a negative final amount; rejecting such input is
//! the caller's job (see [`crate::validation::validate_discount`]).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{DiscountRate, SaleItem};

/// Profit of one line when the sale-level discount is spread over it.
///
/// ```text
/// gross    = selling_price × quantity
/// discount = gross × pct / 100
/// profit   = (gross − discount) − wholesale_price × quantity
/// ```
pub fn line_profit(
    wholesale_price: f64,
    selling_price: f64,
    quantity: i64,
    discount: DiscountRate,
) -> f64 {
    let quantity = quantity as f64;
    let gross = selling_price * quantity;
    let line_discount = gross * discount.fraction();
    (gross - line_discount) - wholesale_price * quantity
}

/// Derived monetary figures of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub total_amount: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub profit: f64,
}

/// Computes totals and profit for `items` under `discount`.
pub fn sale_totals(items: &[SaleItem], discount: DiscountRate) -> SaleTotals {
    let total_amount: f64 = items.iter().map(|item| item.total_price).sum();
    let discount_amount = total_amount * discount.fraction();
    let profit = items
        .iter()
        .map(|item| {
            line_profit(
                item.wholesale_price,
                item.selling_price,
                item.quantity,
                discount,
            )
        })
        .sum();

    SaleTotals {
        total_amount,
        discount_amount,
        final_amount: total_amount - discount_amount,
        profit,
    }
}
