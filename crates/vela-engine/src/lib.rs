//! # vela-engine: Sale Transaction & Inventory Reconciliation Engine
//!
//! The service layer presentation code consumes. Creates, edits and
//! reprices sales while keeping four related records - customer, sale
//! header, sale line items and product stock - mutually consistent.
//!
//! ## The Consistency Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  After every successful operation:                                      │
//! │                                                                         │
//! │  • sale.total_cents == Σ(line totals) + sale.tax_cents                 │
//! │  • every line item belongs to exactly one sale                         │
//! │  • each product's stock reflects exactly the line items that exist     │
//! │    (added line → decrement, removed line → increment, requantified     │
//! │    line → signed delta)                                                │
//! │  • no product's stock is negative                                      │
//! │                                                                         │
//! │  These hold even when a sale is edited after the fact and even when    │
//! │  concurrent sales touch the same product's stock.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`sales`] - the orchestrator: `create_sale`, `update_sale`,
//!   `get_sale_by_invoice_number`, `list_sales`
//! - [`directory`] - phone-keyed customer resolution
//! - [`invoice`] - invoice number generation
//! - [`events`] - the data-changed broadcast feed
//! - [`config`] - tax rate and partial-failure policy
//! - [`error`] - the caller-facing error taxonomy

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod invoice;
pub mod sales;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{EngineConfig, StockPolicy};
pub use directory::{CustomerDirectory, CustomerInput, Resolution, ResolutionOutcome};
pub use error::{EngineError, EngineResult};
pub use events::{Change, ChangeFeed};
pub use sales::{SaleDetail, SaleRevision, SaleSubmission, SaleWriteResult, SalesEngine, StockWarning};
