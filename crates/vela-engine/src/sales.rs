//! # Sale Transaction Orchestrator
//!
//! The entry point for creating and editing sales. Sequences the customer
//! directory, sale persistence, line-item reconciliation and the stock
//! ledger, and owns the all-or-nothing contract for each operation.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(submission, lines)                                         │
//! │                                                                         │
//! │  1. validate          lines non-empty, customer name + phone present   │
//! │  2. resolve customer  directory (its own write, committed first)       │
//! │  3. compute totals    subtotal = Σ qty × price, tax, total (core)      │
//! │  4. TRANSACTION ┌──────────────────────────────────────────────┐       │
//! │     (retried on │  insert header (unique invoice number)       │       │
//! │     invoice     │  insert each line item                       │       │
//! │     collision)  │  reserve stock for each line item            │       │
//! │                 └──────────────────────────────────────────────┘       │
//! │  5. publish change events, return persisted sale                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Update Flow
//! Same shape: validate → resolve → reconcile desired vs original →
//! one transaction applying the header update plus the plan's deletes,
//! updates and inserts with their stock deltas.
//!
//! ## Partial Failure
//! Under [`StockPolicy::Strict`] (default) a failed stock adjustment aborts
//! the transaction: totals, line rows and stock never drift apart. Under
//! [`StockPolicy::BestEffort`] the row writes stand, the failure is logged
//! and reported on the result - never silently dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, StockPolicy};
use crate::directory::{CustomerDirectory, CustomerInput};
use crate::error::{EngineError, EngineResult};
use crate::events::{Change, ChangeFeed};
use crate::invoice::generate_invoice_number;
use vela_core::validation::validate_lines;
use vela_core::{
    reconcile, Customer, LineInput, PaymentMethod, Sale, SaleItem, SaleItemDetail, SaleTotals,
    ValidationError, INVOICE_MAX_ATTEMPTS,
};
use vela_db::repository::sale::{generate_sale_id, generate_sale_item_id};
use vela_db::{Database, DbError, SaleFilter};

// =============================================================================
// Operation DTOs
// =============================================================================

/// Header input for a new sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSubmission {
    pub customer: CustomerInput,
    pub payment_method: PaymentMethod,

    /// When the sale took place; `None` means now.
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Header revision for an existing sale.
///
/// Totals are caller-computed from the desired line set (via
/// [`SaleTotals::from_lines`]), not re-derived here; the engine only checks
/// they are internally consistent before persisting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRevision {
    pub customer: CustomerInput,
    pub payment_method: PaymentMethod,

    /// The (editable) occurrence timestamp.
    pub occurred_at: DateTime<Utc>,

    pub totals: SaleTotals,
}

/// A persisted sale with its customer and line items joined with live
/// product data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub customer: Customer,
    pub items: Vec<SaleItemDetail>,
}

/// A stock adjustment that failed under [`StockPolicy::BestEffort`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockWarning {
    pub product_id: String,
    /// The signed delta that could not be applied.
    pub delta: i64,
    pub message: String,
}

/// Outcome of a successful create/update: the persisted state plus any
/// best-effort stock warnings (always empty under the strict policy).
#[derive(Debug, Clone)]
pub struct SaleWriteResult {
    pub detail: SaleDetail,
    pub stock_warnings: Vec<StockWarning>,
}

// =============================================================================
// Engine
// =============================================================================

/// The sale transaction engine.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./vela.db")).await?;
/// let engine = SalesEngine::new(db, EngineConfig::new(TaxRate::from_bps(500)));
///
/// let result = engine
///     .create_sale(submission, vec![LineInput::new(product_id, 2, 1000)])
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct SalesEngine {
    db: Database,
    directory: CustomerDirectory,
    config: EngineConfig,
    feed: ChangeFeed,
}

impl SalesEngine {
    /// Creates an engine over the given database.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let directory = CustomerDirectory::new(&db);
        let feed = ChangeFeed::new(config.feed_capacity);
        SalesEngine {
            db,
            directory,
            config,
            feed,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying database, for collaborating code (product management,
    /// reporting reads).
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Subscribes to data-changed events emitted after successful writes.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.feed.subscribe()
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates a sale: resolves the customer, persists the header with a
    /// fresh unique invoice number, persists all line items and decrements
    /// stock for each.
    pub async fn create_sale(
        &self,
        submission: SaleSubmission,
        lines: Vec<LineInput>,
    ) -> EngineResult<SaleWriteResult> {
        debug!(line_count = lines.len(), "create_sale");

        validate_lines(&lines)?;

        let resolution = self.directory.resolve(&submission.customer).await?;
        let customer = resolution.customer;

        let totals = SaleTotals::from_lines(&lines, self.config.tax_rate);
        let now = Utc::now();
        let occurred_at = submission.occurred_at.unwrap_or(now);

        let sales = self.db.sales();
        let products = self.db.products();

        let mut attempt = 0;
        let (sale, warnings) = loop {
            attempt += 1;

            let sale = Sale {
                id: generate_sale_id(),
                invoice_number: generate_invoice_number(),
                customer_id: customer.id.clone(),
                payment_method: submission.payment_method,
                subtotal_cents: totals.subtotal_cents,
                tax_cents: totals.tax_cents,
                total_cents: totals.total_cents,
                occurred_at,
                created_at: now,
                updated_at: now,
            };

            let mut tx = self.db.begin().await?;

            match sales.insert_sale(&mut tx, &sale).await {
                Ok(()) => {}
                Err(err) if err.is_unique_violation() => {
                    // Dropping the transaction rolls it back.
                    drop(tx);
                    if attempt >= INVOICE_MAX_ATTEMPTS {
                        return Err(EngineError::Conflict {
                            resource: "invoice number".to_string(),
                        });
                    }
                    warn!(attempt, "Invoice number collision, regenerating");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            let mut warnings = Vec::new();
            for line in &lines {
                let item = SaleItem {
                    id: generate_sale_item_id(),
                    sale_id: sale.id.clone(),
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    total_price_cents: line.total_price_cents(),
                    created_at: now,
                };
                sales.insert_item(&mut tx, &item).await?;

                if let Err(err) = products
                    .reserve_stock(&mut tx, &line.product_id, line.quantity)
                    .await
                {
                    self.absorb_stock_failure(err, &line.product_id, -line.quantity, &mut warnings)?;
                }
            }

            tx.commit().await.map_err(DbError::from)?;
            break (sale, warnings);
        };

        info!(
            sale_id = %sale.id,
            invoice_number = %sale.invoice_number,
            total_cents = sale.total_cents,
            line_count = lines.len(),
            "Sale created"
        );

        self.feed.publish(Change::Sales);
        self.feed.publish(Change::Products);
        if resolution.outcome.wrote() {
            self.feed.publish(Change::Customers);
        }

        let items = sales.get_items_detailed(&sale.id).await?;
        Ok(SaleWriteResult {
            detail: SaleDetail {
                sale,
                customer,
                items,
            },
            stock_warnings: warnings,
        })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Edits a sale: re-resolves the (possibly changed) customer, updates
    /// the header, and applies the reconciliation plan between `original`
    /// (the persisted items the editor loaded) and `desired`.
    ///
    /// Submitting a desired set equal to the persisted one is a pure header
    /// update: no row or stock changes at all.
    pub async fn update_sale(
        &self,
        sale_id: &str,
        revision: SaleRevision,
        desired: Vec<LineInput>,
        original: Vec<SaleItem>,
    ) -> EngineResult<SaleWriteResult> {
        debug!(
            sale_id = %sale_id,
            desired = desired.len(),
            original = original.len(),
            "update_sale"
        );

        validate_lines(&desired)?;
        validate_totals(&revision.totals)?;

        let existing = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::SaleNotFound(sale_id.to_string()))?;

        let resolution = self.directory.resolve(&revision.customer).await?;
        let customer = resolution.customer;

        let plan = reconcile(&desired, &original);
        let now = Utc::now();

        let header = Sale {
            id: existing.id.clone(),
            // immutable after creation
            invoice_number: existing.invoice_number.clone(),
            customer_id: customer.id.clone(),
            payment_method: revision.payment_method,
            subtotal_cents: revision.totals.subtotal_cents,
            tax_cents: revision.totals.tax_cents,
            total_cents: revision.totals.total_cents,
            occurred_at: revision.occurred_at,
            created_at: existing.created_at,
            updated_at: now,
        };

        let sales = self.db.sales();
        let products = self.db.products();
        let mut warnings = Vec::new();

        let mut tx = self.db.begin().await?;

        sales.update_header(&mut tx, &header).await?;

        for item in &plan.to_delete {
            sales.delete_item(&mut tx, &item.id).await?;
            if let Err(err) = products
                .apply_stock_delta(&mut tx, &item.product_id, item.quantity)
                .await
            {
                self.absorb_stock_failure(err, &item.product_id, item.quantity, &mut warnings)?;
            }
        }

        for update in &plan.to_update {
            sales.update_item(&mut tx, update).await?;

            // A negative delta draws additional units and must respect the
            // stock floor; a positive one is a plain return.
            let outcome = if update.stock_delta < 0 {
                products
                    .reserve_stock(&mut tx, &update.product_id, -update.stock_delta)
                    .await
            } else if update.stock_delta > 0 {
                products
                    .apply_stock_delta(&mut tx, &update.product_id, update.stock_delta)
                    .await
            } else {
                Ok(())
            };

            if let Err(err) = outcome {
                self.absorb_stock_failure(err, &update.product_id, update.stock_delta, &mut warnings)?;
            }
        }

        for line in &plan.to_insert {
            let item = SaleItem {
                id: generate_sale_item_id(),
                sale_id: existing.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                total_price_cents: line.total_price_cents(),
                created_at: now,
            };
            sales.insert_item(&mut tx, &item).await?;

            if let Err(err) = products
                .reserve_stock(&mut tx, &line.product_id, line.quantity)
                .await
            {
                self.absorb_stock_failure(err, &line.product_id, -line.quantity, &mut warnings)?;
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %existing.id,
            deleted = plan.to_delete.len(),
            updated = plan.to_update.len(),
            inserted = plan.to_insert.len(),
            total_cents = header.total_cents,
            "Sale updated"
        );

        self.feed.publish(Change::Sales);
        if !plan.is_noop() {
            self.feed.publish(Change::Products);
        }
        if resolution.outcome.wrote() {
            self.feed.publish(Change::Customers);
        }

        let items = sales.get_items_detailed(&existing.id).await?;
        Ok(SaleWriteResult {
            detail: SaleDetail {
                sale: header,
                customer,
                items,
            },
            stock_warnings: warnings,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Looks up one sale by invoice number, with customer contact and line
    /// items joined against live product data.
    pub async fn get_sale_by_invoice_number(
        &self,
        invoice_number: &str,
    ) -> EngineResult<Option<SaleDetail>> {
        let Some(sale) = self.db.sales().get_by_invoice_number(invoice_number).await? else {
            return Ok(None);
        };

        let customer = self
            .db
            .customers()
            .get_by_id(&sale.customer_id)
            .await?
            .ok_or_else(|| {
                EngineError::Storage(DbError::not_found("Customer", &sale.customer_id))
            })?;

        let items = self.db.sales().get_items_detailed(&sale.id).await?;

        Ok(Some(SaleDetail {
            sale,
            customer,
            items,
        }))
    }

    /// Lists sales newest-first with optional filters.
    pub async fn list_sales(&self, filter: &SaleFilter) -> EngineResult<Vec<Sale>> {
        Ok(self.db.sales().list(filter).await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Policy switch for a failed stock adjustment: strict propagates (and
    /// thereby aborts the open transaction), best-effort logs and records a
    /// warning.
    fn absorb_stock_failure(
        &self,
        err: DbError,
        product_id: &str,
        delta: i64,
        warnings: &mut Vec<StockWarning>,
    ) -> EngineResult<()> {
        match self.config.stock_policy {
            StockPolicy::Strict => Err(err.into()),
            StockPolicy::BestEffort => {
                warn!(
                    product_id = %product_id,
                    delta,
                    error = %err,
                    "Stock adjustment failed, continuing per best-effort policy"
                );
                warnings.push(StockWarning {
                    product_id: product_id.to_string(),
                    delta,
                    message: err.to_string(),
                });
                Ok(())
            }
        }
    }
}

/// Caller-supplied totals must satisfy the header invariant before they are
/// persisted.
fn validate_totals(totals: &SaleTotals) -> EngineResult<()> {
    if totals.subtotal_cents < 0 || totals.tax_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "totals".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    if totals.total_cents != totals.subtotal_cents + totals.tax_cents {
        return Err(ValidationError::InvalidFormat {
            field: "totals".to_string(),
            reason: "total must equal subtotal plus tax".to_string(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
