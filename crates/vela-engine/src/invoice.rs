//! # Invoice Numbering
//!
//! Generates the opaque unique string downstream printing and reporting key
//! on. The engine guarantees uniqueness (storage constraint + bounded
//! regeneration), not any particular format.

use chrono::Utc;

/// Generates an invoice number candidate: `INV-<unix millis>-<seq>`.
///
/// The millisecond timestamp makes candidates naturally monotonic; the
/// sequence suffix separates sales landing in the same millisecond. True
/// uniqueness is enforced by the UNIQUE constraint on insert - on collision
/// the orchestrator simply calls this again.
pub fn generate_invoice_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let seq = nanos % 10_000;

    format!("INV-{millis}-{seq:04}")
}

// =============================================================================
// Unit Tests
// =============================================================================
