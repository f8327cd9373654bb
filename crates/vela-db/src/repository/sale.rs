//! # Sale Repository
//!
//! Database operations for sale headers and their line items.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One Sale Write = One Transaction                        │
//! │                                                                         │
//! │  vela-engine                                                           │
//! │       │ begin()                                                        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  insert_sale / update_header      (this repository)             │   │
//! │  │  insert_item / update_item /      (this repository)             │   │
//! │  │  delete_item                                                    │   │
//! │  │  reserve_stock / apply_stock_delta (product repository)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ commit                                                         │
//! │       ▼                                                                 │
//! │  Totals, line rows and stock can never drift apart                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write method therefore takes `&mut SqliteConnection`; reads come
//! off the pool.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vela_core::{ItemUpdate, Sale, SaleItem, SaleItemDetail};

const SALE_COLUMNS: &str = "id, invoice_number, customer_id, payment_method, \
     subtotal_cents, tax_cents, total_cents, occurred_at, created_at, updated_at";

/// Filters for listing sales. Empty filter = all sales, newest first.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    /// Only sales belonging to this customer.
    pub customer_id: Option<String>,

    /// Case-insensitive substring match on the invoice number.
    pub invoice_number_contains: Option<String>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Headers
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by its invoice number (the downstream-facing key).
    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE invoice_number = ?1"
        ))
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Lists sales newest-first with optional filters.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1 = 1"));

        if let Some(customer_id) = &filter.customer_id {
            qb.push(" AND customer_id = ");
            qb.push_bind(customer_id);
        }
        if let Some(fragment) = &filter.invoice_number_contains {
            qb.push(" AND invoice_number LIKE ");
            qb.push_bind(format!("%{fragment}%"));
        }
        qb.push(" ORDER BY occurred_at DESC");

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;

        Ok(sales)
    }

    /// Inserts a sale header.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - invoice number collision; the
    ///   orchestrator regenerates and retries
    pub async fn insert_sale(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_id, payment_method,
                subtotal_cents, tax_cents, total_cents,
                occurred_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.customer_id)
        .bind(sale.payment_method)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.occurred_at)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Updates a sale header's mutable fields.
    ///
    /// The invoice number is immutable and deliberately absent here; totals
    /// are whatever the orchestrator computed for the desired line set.
    pub async fn update_header(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, total_cents = %sale.total_cents, "Updating sale header");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_id = ?2,
                payment_method = ?3,
                subtotal_cents = ?4,
                tax_cents = ?5,
                total_cents = ?6,
                occurred_at = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(sale.payment_method)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.occurred_at)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        Ok(())
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Inserts a line item row.
    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Inserting sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id,
                quantity, unit_price_cents, total_price_cents,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_price_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Applies one reconciliation update to a persisted line item.
    pub async fn update_item(
        &self,
        conn: &mut SqliteConnection,
        update: &ItemUpdate,
    ) -> DbResult<()> {
        debug!(item_id = %update.item_id, quantity = %update.quantity, "Updating sale item");

        let result = sqlx::query(
            r#"
            UPDATE sale_items SET
                quantity = ?2,
                unit_price_cents = ?3,
                total_price_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&update.item_id)
        .bind(update.quantity)
        .bind(update.unit_price_cents)
        .bind(update.total_price_cents)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale item", &update.item_id));
        }

        Ok(())
    }

    /// Deletes a line item row.
    pub async fn delete_item(&self, conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
        debug!(item_id = %item_id, "Deleting sale item");

        let result = sqlx::query("DELETE FROM sale_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale item", item_id));
        }

        Ok(())
    }

    /// Gets all items for a sale, oldest first.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity,
                   unit_price_cents, total_price_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a sale's items joined with live product data (name, catalog
    /// price, current stock) - what an edit surface needs in one query.
    pub async fn get_items_detailed(&self, sale_id: &str) -> DbResult<Vec<SaleItemDetail>> {
        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT
                i.id, i.sale_id, i.product_id, i.quantity,
                i.unit_price_cents, i.total_price_cents, i.created_at,
                p.name AS product_name,
                p.reference_number,
                p.price_cents AS product_price_cents,
                p.stock AS product_stock
            FROM sale_items i
            INNER JOIN products p ON p.id = i.product_id
            WHERE i.sale_id = ?1
            ORDER BY i.created_at, i.id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID - the persisted identity reconciliation
/// matches on.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
