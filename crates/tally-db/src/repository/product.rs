//! # Product Repository
//!
//! The catalog store: product CRUD, search, and the guarded stock update.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Compare-and-Adjust in One Statement                   │
//! │                                                                         │
//! │  UPDATE products                                                       │
//! │     SET stock = stock + :delta                                         │
//! │   WHERE id = :id AND stock + :delta >= 0                               │
//! │       │                                                                 │
//! │       ├── 1 row  ──► applied                                           │
//! │       │                                                                 │
//! │       └── 0 rows ──► re-read the row                                   │
//! │                       ├── missing ──► ProductNotFound                  │
//! │                       └── present ──► InsufficientStock                │
//! │                                                                         │
//! │  No read-modify-write from Rust: SQLite evaluates the check and the    │
//! │  write under its own write lock, so two writers can't both pass.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::changes::{ChangeFeed, ChangeKind, Table};
use crate::error::DbResult;
use tally_core::validation::{validate_new_product, validate_patch};
use tally_core::{CoreError, NewProduct, Product, ProductId, ProductPatch};

macro_rules! select_products {
    ($tail:literal) => {
        concat!(
            "SELECT id, name, description, wholesale_price, selling_price, stock, category, created_at ",
            "FROM products ",
            $tail
        )
    };
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let id = repo.create(&new_product).await?;
/// let low = repo.list_low_stock(5).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ProductRepository { pool, changes }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a product by id.
    pub async fn get(&self, id: ProductId) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_in(&mut conn, id).await
    }

    /// Gets a product by id, failing with `ProductNotFound` when absent.
    pub async fn get_required(&self, id: ProductId) -> DbResult<Product> {
        self.get(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id).into())
    }

    /// Lists all products in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(select_products!("ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Case-insensitive substring search over name and category.
    ///
    /// A blank term returns the whole catalog.
    pub async fn search(&self, term: &str) -> DbResult<Vec<Product>> {
        let products: Vec<Product> = self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.matches(term))
            .collect();

        debug!(term = %term.trim(), count = products.len(), "Searched products");
        Ok(products)
    }

    /// Products with `stock < threshold`, emptiest first.
    pub async fn list_low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let products =
            sqlx::query_as::<_, Product>(select_products!("WHERE stock < ?1 ORDER BY stock, id"))
                .bind(threshold)
                .fetch_all(&self.pool)
                .await?;

        debug!(threshold, count = products.len(), "Listed low-stock products");
        Ok(products)
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a product and returns its new id.
    ///
    /// Name and category are stored trimmed; `created_at` is set to now.
    pub async fn create(&self, product: &NewProduct) -> DbResult<ProductId> {
        validate_new_product(product)?;

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                name, description, wholesale_price, selling_price,
                stock, category, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(product.wholesale_price)
        .bind(product.selling_price)
        .bind(product.stock)
        .bind(product.category.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, name = %product.name.trim(), "Created product");
        self.changes.publish(Table::Products, ChangeKind::Inserted);
        Ok(id)
    }

    /// Applies a partial update in a single statement.
    ///
    /// Only fields present in the patch are validated and written. An
    /// empty patch still reports `ProductNotFound` for an unknown id.
    pub async fn update(&self, id: ProductId, patch: &ProductPatch) -> DbResult<()> {
        validate_patch(patch)?;

        if patch.is_empty() {
            self.get_required(id).await?;
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name            = COALESCE(?2, name),
                description     = COALESCE(?3, description),
                wholesale_price = COALESCE(?4, wholesale_price),
                selling_price   = COALESCE(?5, selling_price),
                stock           = COALESCE(?6, stock),
                category        = COALESCE(?7, category)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.description.as_deref())
        .bind(patch.wholesale_price)
        .bind(patch.selling_price)
        .bind(patch.stock)
        .bind(patch.category.as_deref().map(str::trim))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id).into());
        }

        debug!(id, stock_edit = patch.touches_stock(), "Updated product");
        self.changes.publish(Table::Products, ChangeKind::Updated);
        Ok(())
    }

    /// Deletes a product. Sales that reference it keep their snapshot.
    pub async fn delete(&self, id: ProductId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id).into());
        }

        debug!(id, "Deleted product");
        self.changes.publish(Table::Products, ChangeKind::Deleted);
        Ok(())
    }

    /// Atomically applies `stock += delta`.
    ///
    /// Reserved for the sale coordinator; catalog edits set stock through
    /// [`ProductRepository::update`].
    pub async fn adjust_stock(&self, id: ProductId, delta: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::adjust_stock_in(&mut conn, id, delta).await?;

        self.changes.publish(Table::Products, ChangeKind::Updated);
        Ok(())
    }

    // =========================================================================
    // Connection-scoped helpers (used inside the coordinator's transaction)
    // =========================================================================

    pub(crate) async fn fetch_in(
        conn: &mut SqliteConnection,
        id: ProductId,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(select_products!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(product)
    }

    /// Guarded `stock += delta` on an existing connection or transaction.
    /// Publishes nothing; the caller announces the change once committed.
    pub(crate) async fn adjust_stock_in(
        conn: &mut SqliteConnection,
        id: ProductId,
        delta: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2 WHERE id = ?1 AND stock + ?2 >= 0",
        )
        .bind(id)
        .bind(delta)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            debug!(id, delta, "Adjusted stock");
            return Ok(());
        }

        match Self::fetch_in(conn, id).await? {
            None => Err(CoreError::ProductNotFound(id).into()),
            Some(product) => Err(CoreError::InsufficientStock {
                product_id: id,
                name: product.name,
                available: product.stock,
                requested: delta.saturating_neg(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn notebook() -> NewProduct {
        NewProduct {
            name: "  Notebook A5 ".to_string(),
            description: "Ruled".to_string(),
            wholesale_price: 100.0,
            selling_price: 150.0,
            stock: 10,
            category: "Stationery".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = db().await;
        let repo = db.products();

        let id = repo.create(&notebook()).await.unwrap();
        let product = repo.get(id).await.unwrap().unwrap();

        assert_eq!(product.name, "Notebook A5");
        assert_eq!(product.stock, 10);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let db = db().await;
        let mut product = notebook();
        product.selling_price = -1.0;

        let err = db.products().create(&product).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_patch() {
        let db = db().await;
        let repo = db.products();
        let id = repo.create(&notebook()).await.unwrap();

        let patch = ProductPatch {
            selling_price: Some(175.0),
            stock: Some(25),
            ..Default::default()
        };
        repo.update(id, &patch).await.unwrap();

        let product = repo.get_required(id).await.unwrap();
        assert_eq!(product.selling_price, 175.0);
        assert_eq!(product.stock, 25);
        assert_eq!(product.description, "Ruled");
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id() {
        let db = db().await;
        let repo = db.products();
        let patch = ProductPatch {
            name: Some("Ghost".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            repo.update(42, &patch).await,
            Err(DbError::Domain(CoreError::ProductNotFound(42)))
        ));
        assert!(matches!(
            repo.update(42, &ProductPatch::default()).await,
            Err(DbError::Domain(CoreError::ProductNotFound(42)))
        ));
        assert!(matches!(
            repo.delete(42).await,
            Err(DbError::Domain(CoreError::ProductNotFound(42)))
        ));
    }

    #[tokio::test]
    async fn test_search_and_low_stock() {
        let db = db().await;
        let repo = db.products();
        repo.create(&notebook()).await.unwrap();
        repo.create(&NewProduct {
            name: "Gel Pen".to_string(),
            description: String::new(),
            wholesale_price: 5.0,
            selling_price: 9.5,
            stock: 3,
            category: "Writing".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(repo.search("NOTE").await.unwrap().len(), 1);
        assert_eq!(repo.search("writ").await.unwrap().len(), 1);
        assert_eq!(repo.search("").await.unwrap().len(), 2);

        let low = repo.list_low_stock(5).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Gel Pen");
    }

    #[tokio::test]
    async fn test_adjust_stock_guard() {
        let db = db().await;
        let repo = db.products();
        let id = repo.create(&notebook()).await.unwrap();

        repo.adjust_stock(id, -4).await.unwrap();
        assert_eq!(repo.get_required(id).await.unwrap().stock, 6);

        let err = repo.adjust_stock(id, -7).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 6,
                requested: 7,
                ..
            })
        ));
        assert_eq!(repo.get_required(id).await.unwrap().stock, 6);

        assert!(matches!(
            repo.adjust_stock(999, 1).await,
            Err(DbError::Domain(CoreError::ProductNotFound(999)))
        ));
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let db = db().await;
        let repo = db.products();
        repo.create(&notebook()).await.unwrap();

        assert_eq!(repo.list().await.unwrap(), repo.list().await.unwrap());
    }
}
