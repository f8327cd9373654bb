//! # Change Feed
//!
//! A data-changed signal emitted after successful writes.
//!
//! An explicit notification interface instead of row-level database change
//! streams: the engine emits *which family of records changed*, subscribers
//! re-pull whatever view they need. The engine never runs a subscriber's
//! computation.

use tokio::sync::broadcast;

/// Which family of records a successful write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// A sale header or its line items changed.
    Sales,
    /// Product rows changed (stock movement counts).
    Products,
    /// A customer was created or had contact details updated.
    Customers,
}

/// Broadcast fan-out of [`Change`] events.
///
/// Lagging or absent subscribers never block a write: `broadcast` drops the
/// oldest buffered event for a slow receiver and `publish` ignores the
/// no-receivers case.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Change>,
}

impl ChangeFeed {
    /// Creates a feed with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChangeFeed { tx }
    }

    /// Subscribes to change events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.tx.subscribe()
    }

    /// Publishes a change event. A send error only means nobody is
    /// listening, which is fine.
    pub fn publish(&self, change: Change) {
        let _ = self.tx.send(change);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
