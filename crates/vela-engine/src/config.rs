//! # Engine Configuration

use vela_core::TaxRate;

/// What happens when a stock adjustment fails mid-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockPolicy {
    /// The whole operation rolls back: header, items and stock commit as
    /// one transaction or not at all. This is the default.
    Strict,

    /// Line items are committed and the failed stock adjustment is logged
    /// and reported as a warning on the result. Documented fallback for
    /// callers that prefer a recorded sale over a refused one; the stock
    /// row itself is never left negative.
    BestEffort,
}

/// Engine configuration.
///
/// ## Example
/// ```rust
/// use vela_core::TaxRate;
/// use vela_engine::config::{EngineConfig, StockPolicy};
///
/// let config = EngineConfig::new(TaxRate::from_bps(500)) // 5% tax
///     .stock_policy(StockPolicy::Strict);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tax rate applied to every sale's subtotal.
    pub tax_rate: TaxRate,

    /// Partial-failure behavior for stock adjustments.
    pub stock_policy: StockPolicy,

    /// Buffered capacity of the change feed.
    pub feed_capacity: usize,
}

impl EngineConfig {
    /// Creates a configuration with the given tax rate and defaults
    /// elsewhere.
    pub fn new(tax_rate: TaxRate) -> Self {
        EngineConfig {
            tax_rate,
            stock_policy: StockPolicy::Strict,
            feed_capacity: 16,
        }
    }

    /// Sets the stock partial-failure policy.
    pub fn stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    /// Sets the change feed capacity.
    pub fn feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::new(TaxRate::zero())
    }
}
