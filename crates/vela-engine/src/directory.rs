//! # Customer Directory
//!
//! Resolves a sale's buyer to a stable customer identity keyed by phone
//! number, creating or updating the record as needed.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(name, phone, email)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  normalize phone (strip formatting, 7-15 digits)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT by phone ──── found ──► field diff                              │
//! │       │                          ├── no diff → zero writes (Matched)   │
//! │       │                          └── diff → partial UPDATE (Updated)   │
//! │       └── not found ──► INSERT                                          │
//! │                          ├── ok → Created                               │
//! │                          └── UNIQUE violation → lost the race with a   │
//! │                              concurrent first-time sale; re-read and   │
//! │                              treat as found                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The UNIQUE constraint on phone is the real correctness mechanism; the
//! lookup-then-insert sequence is only an optimization.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use vela_core::validation::{normalize_phone, validate_customer_name};
use vela_core::Customer;
use vela_db::repository::customer::generate_customer_id;
use vela_db::{CustomerRepository, Database};

// =============================================================================
// Input
// =============================================================================

/// Customer identity as supplied on a sale form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl CustomerInput {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        CustomerInput {
            name: name.into(),
            phone: phone.into(),
            email: None,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Trimmed email, with empty treated as absent.
    fn clean_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// How a resolution was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A new customer row was inserted.
    Created,
    /// An existing row matched and changed fields were written.
    Updated,
    /// An existing row matched exactly; zero writes performed.
    Matched,
}

impl ResolutionOutcome {
    /// Whether this resolution wrote anything.
    pub fn wrote(&self) -> bool {
        !matches!(self, ResolutionOutcome::Matched)
    }
}

/// A resolved customer plus what it took to resolve them.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub customer: Customer,
    pub outcome: ResolutionOutcome,
}

/// The phone-keyed customer directory.
#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    customers: CustomerRepository,
}

impl CustomerDirectory {
    /// Creates a directory over the given database.
    pub fn new(db: &Database) -> Self {
        CustomerDirectory {
            customers: db.customers(),
        }
    }

    /// Resolves the input to a customer id, inserting or partially updating
    /// at most one row.
    ///
    /// At most one insert OR one update happens per call, and an identical
    /// re-resolution performs no writes at all.
    pub async fn resolve(&self, input: &CustomerInput) -> EngineResult<Resolution> {
        validate_customer_name(&input.name)?;
        let phone = normalize_phone(&input.phone)?;

        if let Some(existing) = self.customers.find_by_phone(&phone).await? {
            return self.sync_contact(existing, input).await;
        }

        let now = Utc::now();
        let candidate = Customer {
            id: generate_customer_id(),
            name: input.name.trim().to_string(),
            phone: phone.clone(),
            email: input.clean_email(),
            created_at: now,
            updated_at: now,
        };

        match self.customers.insert(&candidate).await {
            Ok(()) => {
                info!(customer_id = %candidate.id, "Customer created");
                Ok(Resolution {
                    customer: candidate,
                    outcome: ResolutionOutcome::Created,
                })
            }
            Err(err) if err.is_unique_violation() => {
                // A concurrent first-time sale for the same phone won the
                // insert; re-read and treat it as a normal match.
                debug!(phone = %phone, "Customer insert lost race, re-reading");
                let existing = self
                    .customers
                    .find_by_phone(&phone)
                    .await?
                    .ok_or(EngineError::Conflict {
                        resource: "customer phone".to_string(),
                    })?;
                self.sync_contact(existing, input).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Applies the field-level diff to an existing row: name when it
    /// differs, email when the incoming value is non-empty and differs. An
    /// empty diff skips the write entirely so `updated_at` doesn't churn.
    async fn sync_contact(
        &self,
        existing: Customer,
        input: &CustomerInput,
    ) -> EngineResult<Resolution> {
        let incoming_name = input.name.trim();
        let name_change = (incoming_name != existing.name).then(|| incoming_name.to_string());

        let email_change = match input.clean_email() {
            Some(incoming) if existing.email.as_deref() != Some(incoming.as_str()) => {
                Some(incoming)
            }
            _ => None,
        };

        if name_change.is_none() && email_change.is_none() {
            return Ok(Resolution {
                customer: existing,
                outcome: ResolutionOutcome::Matched,
            });
        }

        self.customers
            .update_contact(
                &existing.id,
                name_change.as_deref(),
                email_change.as_deref(),
            )
            .await?;

        info!(
            customer_id = %existing.id,
            name_changed = name_change.is_some(),
            email_changed = email_change.is_some(),
            "Customer contact updated"
        );

        let customer = Customer {
            name: name_change.unwrap_or(existing.name),
            email: email_change.or(existing.email),
            updated_at: Utc::now(),
            ..existing
        };

        Ok(Resolution {
            customer,
            outcome: ResolutionOutcome::Updated,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
