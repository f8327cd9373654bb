//! # vela-db: Database Layer for Vela POS
//!
//! SQLite storage for the sale transaction engine, built on sqlx.
//!
//! ## What the Storage Layer Guarantees
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Storage-Level Correctness                              │
//! │                                                                         │
//! │  UNIQUE(customers.phone)        ← two racing first-time sales for one  │
//! │                                   phone collapse to one customer       │
//! │  UNIQUE(sales.invoice_number)   ← collisions surface as typed errors   │
//! │                                   the engine retries                   │
//! │  CHECK(products.stock >= 0)     ← stock can never be driven negative   │
//! │  single-statement delta updates ← no lost stock updates under          │
//! │                                   concurrent sales                     │
//! │  transactions                   ← header + items + stock commit as     │
//! │                                   one unit                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories (customer, product, sale)

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DbTransaction};

// The connection type repository write methods take; re-exported so
// consumers orchestrating transactions don't need a direct sqlx dependency.
pub use sqlx::SqliteConnection;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::{SaleFilter, SaleRepository};
