//! # Product Repository
//!
//! Product CRUD plus the stock ledger.
//!
//! ## The Stock Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-modify-write in application code                        │
//! │     let p = get(id); update(stock = p.stock - 3)                       │
//! │     Two concurrent sales both read 10, both write 7 → lost update      │
//! │                                                                         │
//! │  ✅ CORRECT: single-statement delta update                              │
//! │     UPDATE products SET stock = stock - 3 WHERE id = ?                 │
//! │     SQLite serializes writers; each delta lands exactly once           │
//! │                                                                         │
//! │  Decrements additionally guard against going negative:                 │
//! │     ... WHERE id = ? AND stock >= 3                                    │
//! │     Zero rows affected → missing product OR insufficient stock         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger methods take `&mut SqliteConnection` so they run inside the same
//! transaction as the line-item writes they belong to.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vela_core::Product;

const PRODUCT_COLUMNS: &str =
    "id, name, reference_number, price_cents, stock, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - reference number already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, reference_number, price_cents, stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.reference_number)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a product's catalog fields and absolute stock.
    ///
    /// This is the inventory-management path (receiving, correction). Sale
    /// operations never call it; they go through the delta methods below.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                reference_number = ?3,
                price_cents = ?4,
                stock = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.reference_number)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product row.
    ///
    /// Fails with a foreign-key violation while sale items still reference
    /// it; historical sales keep their products.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Stock Ledger
    // =========================================================================

    /// Applies a signed stock delta as one atomic counter update.
    ///
    /// Used for increments (deleted/shrunk line items return stock) and for
    /// already-validated decrements. The statement never reads stock into
    /// application code, so concurrent sales on the same product cannot lose
    /// an update.
    pub async fn apply_stock_delta(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        delta: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, delta = %delta, "Applying stock delta");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Decrements stock for a sold quantity, refusing to go negative.
    ///
    /// The `stock >= quantity` guard lives in the statement itself, not in a
    /// prior read, which makes it race-free. When the guard refuses, a
    /// follow-up read distinguishes a vanished product from insufficient
    /// stock.
    pub async fn reserve_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, quantity = %quantity, "Reserving stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            return match available {
                Some(available) => Err(DbError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: quantity,
                }),
                None => Err(DbError::not_found("Product", product_id)),
            };
        }

        Ok(())
    }

    /// Counts product rows (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            name: "Blue Pen".to_string(),
            reference_number: None,
            price_cents: 1000,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = product(10);
        repo.insert(&p).await.unwrap();

        let found = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(found.stock, 10);
        assert_eq!(found.price_cents, 1000);
    }

    #[tokio::test]
    async fn test_stock_delta_is_relative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = product(10);
        repo.insert(&p).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        repo.apply_stock_delta(&mut conn, &p.id, -3).await.unwrap();
        repo.apply_stock_delta(&mut conn, &p.id, 1).await.unwrap();
        drop(conn);

        let found = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(found.stock, 8);
    }

    #[tokio::test]
    async fn test_reserve_stock_refuses_overdraw() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = product(2);
        repo.insert(&p).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = repo.reserve_stock(&mut conn, &p.id, 5).await.unwrap_err();
        drop(conn);

        match err {
            DbError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // stock untouched by the refused decrement
        let found = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(found.stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_stock_missing_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = repo
            .reserve_stock(&mut conn, "no-such-product", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.products().delete("ghost").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
