//! # Sale Coordinator
//!
//! The only writer of sales and the only caller of the stock decrement.
//!
//! ## Completing a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       complete_sale(lines, discount)                    │
//! │                                                                         │
//! │  1. validate discount, merge lines        ──► ValidationError          │
//! │                                               InvalidQuantity          │
//! │  2. lock products (ascending id)                                       │
//! │  3. BEGIN                                                              │
//! │  4. load products, snapshot, pre-check    ──► NotFound                 │
//! │                                               InsufficientStock        │
//! │  5. INSERT sale + lines                                                │
//! │  6. guarded stock -= qty, per line        ──► ConsistencyFault         │
//! │  7. COMMIT                                                             │
//! │  8. unlock, publish sales + products changes                           │
//! │                                                                         │
//! │  Any error before 7 drops the transaction: nothing was written.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Step 6 Cannot Fail
//! The locks from step 2 are held from the pre-check through the commit,
//! and every stock write in the process goes through the guarded update.
//! A failing decrement therefore means something bypassed both, and it is
//! reported as a [`CoreError::ConsistencyFault`] rather than an ordinary
//! stock error.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, info};

use crate::changes::{ChangeFeed, ChangeKind, Table};
use crate::error::{DbError, DbResult};
use crate::locks::StockLocks;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use tally_core::validation::validate_discount;
use tally_core::{
    merge_lines, price_basket, BasketLine, CoreError, DiscountRate, PricedBasket, Product,
    ProductId, Sale,
};

/// Turns baskets into committed sales.
#[derive(Debug, Clone)]
pub struct SaleCoordinator {
    pool: SqlitePool,
    changes: ChangeFeed,
    locks: StockLocks,
}

impl SaleCoordinator {
    pub fn new(pool: SqlitePool, changes: ChangeFeed, locks: StockLocks) -> Self {
        SaleCoordinator {
            pool,
            changes,
            locks,
        }
    }

    /// Completes a sale dated now.
    pub async fn complete_sale(
        &self,
        lines: &[BasketLine],
        discount: DiscountRate,
    ) -> DbResult<Sale> {
        self.complete_sale_at(lines, discount, Utc::now()).await
    }

    /// Completes a sale with an explicit date (imports, seeding, tests).
    pub async fn complete_sale_at(
        &self,
        lines: &[BasketLine],
        discount: DiscountRate,
        date: DateTime<Utc>,
    ) -> DbResult<Sale> {
        validate_discount(discount)?;
        let lines = merge_lines(lines)?;

        let guard = self.locks.acquire(lines.iter().map(|l| l.product_id)).await;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        // Take SQLite's write lock before the first read, so a commit from
        // another connection can't invalidate this transaction's snapshot.
        sqlx::query("UPDATE products SET stock = stock WHERE 0")
            .execute(&mut *tx)
            .await?;

        let mut products: HashMap<ProductId, Product> = HashMap::with_capacity(lines.len());
        for line in &lines {
            if let Some(product) = ProductRepository::fetch_in(&mut tx, line.product_id).await? {
                products.insert(product.id, product);
            }
        }

        let sale = price_basket(&lines, &products, discount)?.into_new_sale(date);
        let sale_id = SaleRepository::insert_in(&mut tx, &sale).await?;

        for item in &sale.items {
            match ProductRepository::adjust_stock_in(&mut tx, item.product_id, -item.quantity).await
            {
                Ok(()) => {}
                Err(DbError::Domain(cause)) => {
                    error!(
                        sale_id,
                        product_id = item.product_id,
                        quantity = item.quantity,
                        error = %cause,
                        "Stock decrement failed after pre-check; rolling back"
                    );
                    return Err(CoreError::ConsistencyFault {
                        reason: format!(
                            "stock decrement of product {} by {} failed after pre-check: {}",
                            item.product_id, item.quantity, cause
                        ),
                    }
                    .into());
                }
                Err(other) => return Err(other),
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        drop(guard);

        self.changes.publish(Table::Sales, ChangeKind::Inserted);
        self.changes.publish(Table::Products, ChangeKind::Updated);

        let sale = sale.into_sale(sale_id);
        info!(
            sale_id,
            lines = sale.items.len(),
            items = sale.items_sold(),
            final_amount = sale.final_amount,
            profit = sale.profit,
            "Sale completed"
        );
        Ok(sale)
    }

    /// Prices a basket against the current catalog without writing.
    ///
    /// Same checks as [`SaleCoordinator::complete_sale`], but advisory:
    /// stock may change before the sale is actually completed.
    pub async fn preview(
        &self,
        lines: &[BasketLine],
        discount: DiscountRate,
    ) -> DbResult<PricedBasket> {
        validate_discount(discount)?;
        let lines = merge_lines(lines)?;

        let mut conn = self.pool.acquire().await?;
        let mut products = HashMap::with_capacity(lines.len());
        for line in &lines {
            if let Some(product) = ProductRepository::fetch_in(&mut conn, line.product_id).await? {
                products.insert(product.id, product);
            }
        }

        let priced = price_basket(&lines, &products, discount)?;
        debug!(
            lines = priced.items.len(),
            final_amount = priced.totals.final_amount,
            "Basket previewed"
        );
        Ok(priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{NewProduct, ValidationError};

    async fn setup(stock: i64) -> (Database, ProductId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = db
            .products()
            .create(&NewProduct {
                name: "Notebook A5".to_string(),
                description: String::new(),
                wholesale_price: 100.0,
                selling_price: 150.0,
                stock,
                category: "Stationery".to_string(),
            })
            .await
            .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn test_complete_sale_scenario() {
        let (db, id) = setup(10).await;

        let sale = db
            .checkout()
            .complete_sale(&[BasketLine::new(id, 4)], DiscountRate::from_percentage(10.0))
            .await
            .unwrap();

        assert_eq!(sale.total_amount, 600.0);
        assert_eq!(sale.discount_amount, 60.0);
        assert_eq!(sale.final_amount, 540.0);
        assert!((sale.profit - 140.0).abs() < 1e-9);
        assert_eq!(db.products().get_required(id).await.unwrap().stock, 6);
        assert_eq!(db.sales().get(sale.id).await.unwrap(), Some(sale));
    }

    #[tokio::test]
    async fn test_rejected_discount_writes_nothing() {
        let (db, id) = setup(10).await;

        let err = db
            .checkout()
            .complete_sale(&[BasketLine::new(id, 1)], DiscountRate::from_percentage(120.0))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get_required(id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_missing_product_aborts_whole_basket() {
        let (db, id) = setup(10).await;

        let err = db
            .checkout()
            .complete_sale(
                &[BasketLine::new(id, 2), BasketLine::new(id + 100, 1)],
                DiscountRate::zero(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get_required(id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let (db, id) = setup(10).await;

        let priced = db
            .checkout()
            .preview(&[BasketLine::new(id, 2), BasketLine::new(id, 1)], DiscountRate::zero())
            .await
            .unwrap();

        assert_eq!(priced.items.len(), 1);
        assert_eq!(priced.items[0].quantity, 3);
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get_required(id).await.unwrap().stock, 10);
    }
}
