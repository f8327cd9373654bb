//! # Engine Error Types
//!
//! The error taxonomy callers see, mapped from the lower layers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Error Taxonomy                                     │
//! │                                                                         │
//! │  Validation        empty cart, missing customer fields, bad phone      │
//! │                    → rejected BEFORE any write, zero side effects      │
//! │                                                                         │
//! │  Conflict          uniqueness violation that survived local recovery   │
//! │                    (phone conflicts are absorbed by re-reading;        │
//! │                    invoice conflicts by regenerating - this variant    │
//! │                    means the retries ran out)                          │
//! │                                                                         │
//! │  InsufficientStock guarded decrement refused; the transaction rolled   │
//! │                    back under the strict policy                        │
//! │                                                                         │
//! │  Storage           transport/availability failure from SQLite          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use vela_core::ValidationError;
use vela_db::DbError;

/// Errors surfaced by the sale transaction engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected before any write.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A uniqueness conflict that local recovery could not absorb.
    #[error("Conflict on {resource}: retries exhausted")]
    Conflict { resource: String },

    /// Not enough units on hand for a decrement.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The referenced sale does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A line references a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Storage failure (transport, availability, unexpected constraint).
    #[error("Storage error: {0}")]
    Storage(DbError),
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => EngineError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            DbError::NotFound { ref entity, ref id } if entity == "Product" => {
                EngineError::ProductNotFound(id.clone())
            }
            other => EngineError::Storage(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
