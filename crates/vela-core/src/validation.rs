//! # Validation Module
//!
//! Input validation for sale submissions and customer identity.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (engine entry points)                            │
//! │  ├── Empty cart, missing customer fields, bad quantities               │
//! │  └── Rejected synchronously, before any storage write                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (phone, invoice number)                        │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                          │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  The constraints are the real correctness mechanism for races; this    │
//! │  layer exists to fail fast with a useful message.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::types::LineInput;
use crate::{MAX_LINE_QUANTITY, MAX_SALE_LINES};

// =============================================================================
// Customer Identity
// =============================================================================

/// Validates a customer name.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Normalizes a phone number into the canonical stored form.
///
/// Phone is the customer's natural key, so two spellings of the same number
/// must collapse to one record. Rules:
/// - spaces, dashes, dots and parentheses are stripped
/// - a single leading `+` is kept
/// - what remains must be 7 to 15 digits
///
/// ## Example
/// ```rust
/// use vela_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "+919876543210");
/// assert_eq!(normalize_phone("(555) 012.3456").unwrap(), "5550123456");
/// assert!(normalize_phone("").is_err());
/// assert!(normalize_phone("12ab34").is_err());
/// ```
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "customer phone".to_string(),
        });
    }

    let mut normalized = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        match c {
            '+' if i == 0 => normalized.push('+'),
            ' ' | '-' | '.' | '(' | ')' => {}
            d if d.is_ascii_digit() => normalized.push(d),
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "customer phone".to_string(),
                    reason: format!("unexpected character '{c}'"),
                })
            }
        }
    }

    let digits = normalized.trim_start_matches('+').len();
    if !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "customer phone".to_string(),
            reason: "must contain 7 to 15 digits".to_string(),
        });
    }

    Ok(normalized)
}

// =============================================================================
// Line Items
// =============================================================================

/// Validates a single line's quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents. Zero is allowed (giveaway lines).
pub fn validate_unit_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a desired line-item set as a whole: non-empty, bounded, and
/// every line individually well-formed.
///
/// A sale must carry at least one item; callers reject an empty desired set
/// here BEFORE reconciliation ever sees it (reconciliation itself would
/// happily plan a delete-everything edit).
pub fn validate_lines(lines: &[LineInput]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    if lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::TooManyLines {
            max: MAX_SALE_LINES,
        });
    }

    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product id".to_string(),
            });
        }
        validate_quantity(line.quantity)?;
        validate_unit_price_cents(line.unit_price_cents)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
