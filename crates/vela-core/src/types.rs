//! # Domain Types
//!
//! Core domain types for the sale transaction engine.
//!
//! ## Record Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Record Ownership                                │
//! │                                                                         │
//! │  ┌──────────────┐      owns (cascade)      ┌──────────────┐            │
//! │  │     Sale     │─────────────────────────►│   SaleItem   │            │
//! │  │ invoice_no   │                          │ qty × price  │            │
//! │  └──────┬───────┘                          └──────┬───────┘            │
//! │         │ references (shared,                     │ references         │
//! │         │ looked up by phone)                     │ (external row)     │
//! │         ▼                                         ▼                    │
//! │  ┌──────────────┐                          ┌──────────────┐            │
//! │  │   Customer   │                          │   Product    │            │
//! │  │ phone = key  │                          │ stock ledger │            │
//! │  └──────────────┘                          └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Entities carry an immutable UUID `id` for relations plus a business key
//! where one exists (customer phone, sale invoice number).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 500 bps = 5%. Integer bps compose
/// with integer cents without ever touching floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid. Recorded verbatim on the sale header; gateway
/// mechanics are outside this engine.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// UPI / wallet transfer.
    Upi,
    /// Online gateway checkout.
    Online,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer, identified by normalized phone number.
///
/// At most one customer record exists per phone; the storage layer enforces
/// this with a UNIQUE constraint. Customers are never deleted by the engine.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name; updated when a later sale supplies a different one.
    pub name: String,

    /// Normalized phone number - the natural key.
    pub phone: String,

    /// Optional email; only overwritten by a non-empty differing value.
    pub email: Option<String>,

    /// When the customer was first seen.
    pub created_at: DateTime<Utc>,

    /// When contact details last changed (no-op resolutions don't touch it).
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product row; `stock` is the authoritative on-hand quantity.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on invoices.
    pub name: String,

    /// Optional business reference (unique when present).
    pub reference_number: Option<String>,

    /// Current catalog price in cents. Line items snapshot their own price;
    /// this value is never re-read during a sale edit.
    pub price_cents: i64,

    /// On-hand quantity. Changed only through ledger operations tied to a
    /// line-item lifecycle event; never driven negative by the engine.
    pub stock: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the catalog price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether `quantity` more units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header: one checkout transaction.
///
/// Invariant after every successful write:
/// `total_cents == subtotal_cents + tax_cents`.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Unique business key, generated at creation, immutable thereafter.
    pub invoice_number: String,

    /// The resolved buyer.
    pub customer_id: String,

    pub payment_method: PaymentMethod,

    /// Sum of line totals, in cents.
    pub subtotal_cents: i64,

    /// Tax on the subtotal, in cents.
    pub tax_cents: i64,

    /// subtotal + tax, in cents.
    pub total_cents: i64,

    /// When the sale took place. Editable after creation (back-dated
    /// invoices are a real workflow); distinct from row bookkeeping below.
    pub occurred_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item belonging to exactly one sale.
///
/// `unit_price_cents` is frozen at the moment the item entered the sale; a
/// later catalog price change never reaches persisted lines unless an editor
/// explicitly reprices them.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    /// Persisted identity, assigned at insertion. Reconciliation matches on
    /// this id, never on product.
    pub id: String,

    pub sale_id: String,
    pub product_id: String,

    /// Units sold; always positive.
    pub quantity: i64,

    /// Price snapshot in cents.
    pub unit_price_cents: i64,

    /// quantity × unit_price, in cents.
    pub total_price_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// A line item joined with live product data (name, catalog price, current
/// stock). This is what the edit screen works from: frozen sale figures next
/// to today's stock.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemDetail {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,

    /// Product name as of now (NOT a snapshot).
    pub product_name: String,
    /// Product business reference as of now.
    pub reference_number: Option<String>,
    /// Current catalog price, for "reprice to catalog" flows.
    pub product_price_cents: i64,
    /// Current on-hand stock, for stock-limit checks while editing.
    pub product_stock: i64,
}

impl SaleItemDetail {
    /// Drops the joined product columns, leaving the persisted row.
    pub fn into_item(self) -> SaleItem {
        SaleItem {
            id: self.id,
            sale_id: self.sale_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            total_price_cents: self.total_price_cents,
            created_at: self.created_at,
        }
    }
}

// =============================================================================
// Line Input
// =============================================================================

/// One desired line of a sale, as supplied by a caller.
///
/// ## Identity Rules
/// - `id: None` - the line has no persisted identity yet and is always an
///   insert, regardless of product match.
/// - `id: Some(..)` - refers to a persisted [`SaleItem`]; quantity/price
///   changes become updates against that row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// Persisted line-item id, if this line already exists on the sale.
    pub id: Option<String>,

    pub product_id: String,
    pub quantity: i64,

    /// Price snapshot chosen at sale (or edit) time, in cents.
    pub unit_price_cents: i64,
}

impl LineInput {
    /// A brand-new line with no persisted identity.
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        LineInput {
            id: None,
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// The line that exactly reproduces a persisted item. Edit surfaces
    /// start from these and mutate quantity/price from there.
    pub fn from_item(item: &SaleItem) -> Self {
        LineInput {
            id: Some(item.id.clone()),
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
        }
    }

    /// A line referring to a persisted item.
    pub fn persisted(
        id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Self {
        LineInput {
            id: Some(id.into()),
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// quantity × unit_price, in cents.
    #[inline]
    pub fn total_price_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents
    }
}

// =============================================================================
// Sale Totals
// =============================================================================

/// The three figures a sale header carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl SaleTotals {
    /// Computes totals from desired lines at the given tax rate.
    ///
    /// This is the ONE place the `total = subtotal + tax` formula lives.
    /// The create path uses it internally; edit callers use it to build the
    /// header revision they submit.
    pub fn from_lines(lines: &[LineInput], rate: TaxRate) -> Self {
        let subtotal: i64 = lines.iter().map(|l| l.total_price_cents()).sum();
        let tax = Money::from_cents(subtotal).calculate_tax(rate).cents();
        SaleTotals {
            subtotal_cents: subtotal,
            tax_cents: tax,
            total_cents: subtotal + tax,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
