//! # Basket
//!
//! Turning caller-supplied (product, quantity) pairs into priced sale lines.
//!
//! ## Basket Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Basket → Sale Lines                             │
//! │                                                                         │
//! │  Raw lines            merge_lines()          price_basket()             │
//! │  ─────────            ─────────────          ──────────────             │
//! │                                                                         │
//! │  (#7 × 2)  ──┐                                                          │
//! │  (#3 × 1)  ──┼──►  (#7 × 5)  ──┐      lookup  ──►  NotFound?            │
//! │  (#7 × 3)  ──┘     (#3 × 1)  ──┴──►   snapshot ──►  SaleItem            │
//! │                                       pre-check ──► InsufficientStock?  │
//! │  Empty?        ──► EmptyBasket        totals   ──►  SaleTotals          │
//! │  qty ≤ 0?      ──► InvalidQuantity                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repeated ids are summed into one line at the position the id was first
//! seen, so a basket built up click by click becomes a single stock
//! decrement per product.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::pricing::{self, SaleTotals};
use crate::types::{BasketLine, DiscountRate, NewSale, Product, ProductId, SaleItem};

// =============================================================================
// Basket Accumulator
// =============================================================================

/// A not-yet-committed basket held by the presentation layer.
///
/// Adding the same product twice accumulates quantity. Nothing here is
/// checked against the catalog; that happens when the sale is completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Basket {
    lines: Vec<BasketLine>,
}

impl Basket {
    /// Creates an empty basket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    pub fn add(&mut self, product_id: ProductId, quantity: i64) {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(BasketLine::new(product_id, quantity)),
        }
    }

    /// Sets the quantity of a line. Zero or less removes it.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(BasketLine::new(product_id, quantity)),
        }
    }

    /// Removes a product from the basket. Returns false if it was absent.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[BasketLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines.
    pub fn total_units(&self) -> i64 {
        self.lines
            .iter()
            .fold(0i64, |total, l| total.saturating_add(l.quantity))
    }

    /// Prices the basket against a catalog snapshot without committing.
    ///
    /// Runs the same checks as sale completion, so the presentation layer
    /// can show totals and stock problems before the user confirms.
    pub fn preview(
        &self,
        products: &HashMap<ProductId, Product>,
        discount: DiscountRate,
    ) -> CoreResult<PricedBasket> {
        let lines = merge_lines(&self.lines)?;
        price_basket(&lines, products, discount)
    }
}

impl From<Vec<BasketLine>> for Basket {
    fn from(lines: Vec<BasketLine>) -> Self {
        let mut basket = Basket::new();
        for line in lines {
            basket.add(line.product_id, line.quantity);
        }
        basket
    }
}

// =============================================================================
// Merging
// =============================================================================

/// Validates raw lines and merges duplicate product ids.
///
/// ## Errors
/// - [`ValidationError::EmptyBasket`] when `lines` is empty
/// - [`CoreError::InvalidQuantity`] for any line with quantity ≤ 0
pub fn merge_lines(lines: &[BasketLine]) -> CoreResult<Vec<BasketLine>> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyBasket.into());
    }

    let mut merged: Vec<BasketLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or(
                    CoreError::InvalidQuantity {
                        product_id: line.product_id,
                        quantity: line.quantity,
                    },
                )?;
            }
            None => merged.push(*line),
        }
    }

    Ok(merged)
}

// =============================================================================
// Pricing
// =============================================================================

/// Sale lines snapshotted from the catalog, with their totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedBasket {
    pub items: Vec<SaleItem>,
    pub discount: DiscountRate,
    pub totals: SaleTotals,
}

impl PricedBasket {
    /// Stamps the priced basket with a date, ready for the ledger.
    pub fn into_new_sale(self, date: DateTime<Utc>) -> NewSale {
        NewSale {
            date,
            items: self.items,
            discount: self.discount,
            totals: self.totals,
        }
    }
}

/// Snapshots merged lines against `products` and computes totals.
///
/// Every line is resolved first (missing product fails the whole basket),
/// then every line is checked against current stock. Either failure
/// leaves nothing half-priced behind.
///
/// `lines` is expected to be the output of [`merge_lines`].
pub fn price_basket(
    lines: &[BasketLine],
    products: &HashMap<ProductId, Product>,
    discount: DiscountRate,
) -> CoreResult<PricedBasket> {
    let mut resolved = Vec::with_capacity(lines.len());
    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or(CoreError::ProductNotFound(line.product_id))?;
        resolved.push((product, line.quantity));
    }

    for (product, quantity) in &resolved {
        if !product.can_sell(*quantity) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                available: product.stock,
                requested: *quantity,
            });
        }
    }

    let items: Vec<SaleItem> = resolved
        .into_iter()
        .map(|(product, quantity)| SaleItem::snapshot(product, quantity))
        .collect();
    let totals = pricing::sale_totals(&items, discount);

    Ok(PricedBasket {
        items,
        discount,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: ProductId, stock: i64) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            description: String::new(),
            wholesale_price: 100.0,
            selling_price: 150.0,
            stock,
            category: "General".to_string(),
            created_at: Utc::now(),
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_basket_add_accumulates() {
        let mut basket = Basket::new();
        basket.add(7, 2);
        basket.add(3, 1);
        basket.add(7, 3);

        assert_eq!(basket.len(), 2);
        assert_eq!(basket.lines()[0], BasketLine::new(7, 5));
        assert_eq!(basket.total_units(), 6);
    }

    #[test]
    fn test_total_units_saturates() {
        let mut basket = Basket::new();
        basket.add(1, i64::MAX);
        basket.add(2, i64::MAX);
        basket.add(1, 5);

        assert_eq!(basket.lines()[0].quantity, i64::MAX);
        assert_eq!(basket.total_units(), i64::MAX);
    }

    #[test]
    fn test_basket_set_quantity_and_remove() {
        let mut basket = Basket::new();
        basket.add(1, 2);
        basket.set_quantity(1, 4);
        assert_eq!(basket.lines()[0].quantity, 4);

        basket.set_quantity(1, 0);
        assert!(basket.is_empty());
        assert!(!basket.remove(1));
    }

    #[test]
    fn test_merge_lines_sums_duplicates_in_first_seen_order() {
        let lines = [
            BasketLine::new(7, 2),
            BasketLine::new(3, 1),
            BasketLine::new(7, 3),
        ];
        let merged = merge_lines(&lines).unwrap();
        assert_eq!(merged, vec![BasketLine::new(7, 5), BasketLine::new(3, 1)]);
    }

    #[test]
    fn test_merge_lines_rejects_empty_and_bad_quantity() {
        assert!(matches!(
            merge_lines(&[]),
            Err(CoreError::Validation(ValidationError::EmptyBasket))
        ));
        assert!(matches!(
            merge_lines(&[BasketLine::new(1, 0)]),
            Err(CoreError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            merge_lines(&[BasketLine::new(1, 2), BasketLine::new(2, -1)]),
            Err(CoreError::InvalidQuantity { product_id: 2, .. })
        ));
    }

    #[test]
    fn test_price_basket_scenario() {
        let products = catalog(vec![product(1, 10)]);
        let priced = price_basket(
            &[BasketLine::new(1, 4)],
            &products,
            DiscountRate::from_percentage(10.0),
        )
        .unwrap();

        assert_eq!(priced.items.len(), 1);
        assert_eq!(priced.totals.total_amount, 600.0);
        assert_eq!(priced.totals.discount_amount, 60.0);
        assert_eq!(priced.totals.final_amount, 540.0);
        assert!((priced.totals.profit - 140.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_basket_missing_product() {
        let products = catalog(vec![product(1, 10)]);
        let result = price_basket(
            &[BasketLine::new(1, 1), BasketLine::new(99, 1)],
            &products,
            DiscountRate::zero(),
        );
        assert!(matches!(result, Err(CoreError::ProductNotFound(99))));
    }

    #[test]
    fn test_price_basket_insufficient_stock() {
        let products = catalog(vec![product(1, 3)]);
        let result = price_basket(&[BasketLine::new(1, 4)], &products, DiscountRate::zero());
        assert!(matches!(
            result,
            Err(CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_preview_merges_before_stock_check() {
        let products = catalog(vec![product(1, 5)]);
        let mut basket = Basket::new();
        basket.add(1, 3);
        basket.add(1, 3);

        let result = basket.preview(&products, DiscountRate::zero());
        assert!(matches!(
            result,
            Err(CoreError::InsufficientStock { requested: 6, .. })
        ));
    }
}
