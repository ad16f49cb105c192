//! # Sale Repository
//!
//! The ledger store: append-only sales with their snapshotted lines.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Tables                                    │
//! │                                                                         │
//! │  sales                          sale_items                              │
//! │  ┌───────────────────────┐      ┌──────────────────────────────────┐   │
//! │  │ id (autoincrement)    │◄─────┤ sale_id, position (PK)           │   │
//! │  │ date (RFC 3339 text)  │      │ product_id  (no FK, lookup only) │   │
//! │  │ total_amount          │      │ product_name, prices (snapshot)  │   │
//! │  │ discount_percentage   │      │ quantity, total_price            │   │
//! │  │ discount_amount       │      └──────────────────────────────────┘   │
//! │  │ final_amount, profit  │                                              │
//! │  └───────────────────────┘                                              │
//! │                                                                         │
//! │  append() writes the header and all lines in one transaction.          │
//! │  No update or delete is exposed for committed sales.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are stored exactly as computed by the caller; nothing is
//! re-validated here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::changes::{ChangeFeed, ChangeKind, Table};
use crate::error::{DbError, DbResult};
use tally_core::{NewSale, Sale, SaleId, SaleItem};

macro_rules! select_sales {
    ($tail:literal) => {
        concat!(
            "SELECT id, date, total_amount, discount_percentage, discount_amount, final_amount, profit ",
            "FROM sales ",
            $tail
        )
    };
}

macro_rules! select_items {
    ($tail:literal) => {
        concat!(
            "SELECT sale_id, product_id, product_name, quantity, wholesale_price, selling_price, total_price ",
            "FROM sale_items ",
            $tail
        )
    };
}

/// Header row of a sale.
#[derive(Debug, FromRow)]
struct SaleRow {
    id: SaleId,
    date: DateTime<Utc>,
    total_amount: f64,
    discount_percentage: f64,
    discount_amount: f64,
    final_amount: f64,
    profit: f64,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        Sale {
            id: self.id,
            date: self.date,
            items,
            total_amount: self.total_amount,
            discount_percentage: self.discount_percentage,
            discount_amount: self.discount_amount,
            final_amount: self.final_amount,
            profit: self.profit,
        }
    }
}

/// Line row, tagged with the sale it belongs to.
#[derive(Debug, FromRow)]
struct SaleItemRow {
    sale_id: SaleId,
    #[sqlx(flatten)]
    item: SaleItem,
}

/// Joins header rows with their lines. Lines must arrive in position order.
fn assemble(rows: Vec<SaleRow>, items: Vec<SaleItemRow>) -> Vec<Sale> {
    let mut by_sale: HashMap<SaleId, Vec<SaleItem>> = HashMap::with_capacity(rows.len());
    for row in items {
        by_sale.entry(row.sale_id).or_default().push(row.item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_sale.remove(&row.id).unwrap_or_default();
            row.into_sale(items)
        })
        .collect()
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        SaleRepository { pool, changes }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale with its lines.
    pub async fn get(&self, id: SaleId) -> DbResult<Option<Sale>> {
        let Some(row) = sqlx::query_as::<_, SaleRow>(select_sales!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items =
            sqlx::query_as::<_, SaleItemRow>(select_items!("WHERE sale_id = ?1 ORDER BY position"))
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(assemble(vec![row], items).pop())
    }

    /// Lists every sale in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(select_sales!("ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        let items =
            sqlx::query_as::<_, SaleItemRow>(select_items!("ORDER BY sale_id, position"))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = rows.len(), "Listed sales");
        Ok(assemble(rows, items))
    }

    /// Sales with `start <= date <= end`, oldest first.
    pub async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(select_sales!(
            "WHERE date BETWEEN ?1 AND ?2 ORDER BY date, id"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, SaleItemRow>(select_items!(
            "WHERE sale_id IN (SELECT id FROM sales WHERE date BETWEEN ?1 AND ?2) \
             ORDER BY sale_id, position"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(%start, %end, count = rows.len(), "Listed sales by date range");
        Ok(assemble(rows, items))
    }

    /// Newest sales first, at most `limit`.
    pub async fn list_recent(&self, limit: usize) -> DbResult<Vec<Sale>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows =
            sqlx::query_as::<_, SaleRow>(select_sales!("ORDER BY date DESC, id DESC LIMIT ?1"))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, SaleItemRow>(select_items!(
            "WHERE sale_id IN (SELECT id FROM sales ORDER BY date DESC, id DESC LIMIT ?1) \
             ORDER BY sale_id, position"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(rows, items))
    }

    /// Counts sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Appends a fully computed sale and returns its id.
    ///
    /// Stock is not touched; completing a sale goes through
    /// [`crate::checkout::SaleCoordinator`].
    pub async fn append(&self, sale: &NewSale) -> DbResult<SaleId> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let id = Self::insert_in(&mut tx, sale).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.changes.publish(Table::Sales, ChangeKind::Inserted);
        Ok(id)
    }

    /// Writes header and lines on an existing connection or transaction.
    /// Publishes nothing; the caller announces the sale once committed.
    pub(crate) async fn insert_in(conn: &mut SqliteConnection, sale: &NewSale) -> DbResult<SaleId> {
        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                date, total_amount, discount_percentage,
                discount_amount, final_amount, profit
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(sale.date)
        .bind(sale.totals.total_amount)
        .bind(sale.discount.percentage())
        .bind(sale.totals.discount_amount)
        .bind(sale.totals.final_amount)
        .bind(sale.totals.profit)
        .execute(&mut *conn)
        .await?;

        let sale_id = result.last_insert_rowid();

        for (position, item) in sale.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, position, product_id, product_name, quantity,
                    wholesale_price, selling_price, total_price
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(sale_id)
            .bind(position as i64)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.wholesale_price)
            .bind(item.selling_price)
            .bind(item.total_price)
            .execute(&mut *conn)
            .await?;
        }

        debug!(sale_id, items = sale.items.len(), "Inserted sale");
        Ok(sale_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tally_core::{DiscountRate, Product};

    use crate::pool::{Database, DbConfig};

    fn product() -> Product {
        Product {
            id: 1,
            name: "Notebook A5".to_string(),
            description: String::new(),
            wholesale_price: 100.0,
            selling_price: 150.0,
            stock: 10,
            category: "Stationery".to_string(),
            created_at: Utc::now(),
        }
    }

    fn new_sale(day: u32, quantity: i64) -> NewSale {
        let date = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        let items = vec![
            SaleItem::snapshot(&product(), quantity),
            SaleItem::snapshot(&product(), 1),
        ];
        NewSale::priced(date, items, DiscountRate::from_percentage(10.0))
    }

    #[tokio::test]
    async fn test_append_and_get_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let sale = new_sale(1, 4);
        let id = repo.append(&sale).await.unwrap();
        let stored = repo.get(id).await.unwrap().unwrap();

        assert_eq!(stored, sale.into_sale(id));
        assert_eq!(stored.items[0].quantity, 4);
        assert!(repo.get(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_date_range_is_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();
        for day in [1, 2, 3, 4] {
            repo.append(&new_sale(day, 1)).await.unwrap();
        }

        let start = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap();
        let sales = repo.list_by_date_range(start, end).await.unwrap();

        assert_eq!(sales.len(), 2);
        assert!(sales.iter().all(|s| s.items.len() == 2));
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();
        for day in [3, 1, 2] {
            repo.append(&new_sale(day, 1)).await.unwrap();
        }

        let recent = repo.list_recent(2).await.unwrap();
        let days: Vec<_> = recent.iter().map(|s| s.date.format("%d").to_string()).collect();
        assert_eq!(days, vec!["03", "02"]);
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }
}
