//! # Sale Item Reconciler
//!
//! Diffs a sale's desired line items against the persisted ones and produces
//! the minimal set of row operations plus their stock effects.
//!
//! ## How an Edit Becomes a Plan
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reconciliation                                     │
//! │                                                                         │
//! │  persisted items          desired lines            plan                 │
//! │  ───────────────          ─────────────            ────                 │
//! │  {id:1, A, qty 2}   ──┐   {id:1, A, qty 5}   ──►  update id 1 → qty 5  │
//! │                       │                            stock A: 2−5 = −3    │
//! │  {id:2, B, qty 1}   ──┼── (absent)           ──►  delete id 2          │
//! │                       │                            stock B: +1          │
//! │                       └── {id:∅, C, qty 4}   ──►  insert C             │
//! │                                                    stock C: −4          │
//! │                                                                         │
//! │  Matching key is the PERSISTED ITEM ID, never the product: the same    │
//! │  product can legitimately appear on two lines at different prices.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each line's stock effect is independent, so the three categories carry no
//! cross-item ordering requirement. The orchestrator applies the whole plan
//! inside one transaction.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{LineInput, SaleItem};

// =============================================================================
// Plan Types
// =============================================================================

/// An update against one persisted line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    /// Persisted identity of the row being updated.
    pub item_id: String,

    /// Product the row points at (unchanged by an update).
    pub product_id: String,

    /// New quantity.
    pub quantity: i64,

    /// New frozen unit price, in cents.
    pub unit_price_cents: i64,

    /// Recomputed quantity × unit_price, in cents.
    pub total_price_cents: i64,

    /// `original_quantity - new_quantity`: negative when the edit takes more
    /// units out of stock, positive when it returns units.
    pub stock_delta: i64,
}

/// The computed set of inserts/updates/deletes that moves a sale's persisted
/// items to a new desired state, with stock restitution built in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Persisted items absent from the desired set. Deleting one returns its
    /// full quantity to stock.
    pub to_delete: Vec<SaleItem>,

    /// Persisted items whose quantity or unit price changed.
    pub to_update: Vec<ItemUpdate>,

    /// Desired lines with no persisted identity yet. Inserting one removes
    /// its full quantity from stock.
    pub to_insert: Vec<LineInput>,
}

impl ReconciliationPlan {
    /// True when the desired state already matches the persisted state.
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty() && self.to_update.is_empty() && self.to_insert.is_empty()
    }

    /// Net signed stock adjustment per product, summed across all three
    /// categories. Zero-net products are omitted.
    ///
    /// This is exactly the quantity change the ledger must absorb: removed
    /// items' full quantity, changed items' signed delta, added items' full
    /// quantity (negated).
    pub fn stock_deltas(&self) -> BTreeMap<String, i64> {
        let mut deltas: BTreeMap<String, i64> = BTreeMap::new();

        for item in &self.to_delete {
            *deltas.entry(item.product_id.clone()).or_default() += item.quantity;
        }
        for update in &self.to_update {
            *deltas.entry(update.product_id.clone()).or_default() += update.stock_delta;
        }
        for line in &self.to_insert {
            *deltas.entry(line.product_id.clone()).or_default() -= line.quantity;
        }

        deltas.retain(|_, delta| *delta != 0);
        deltas
    }
}

// =============================================================================
// Reconcile
// =============================================================================

/// Computes the reconciliation plan for one sale.
///
/// ## Matching
/// - desired line with `id: Some(..)` matching a persisted item: kept;
///   becomes an update iff quantity or unit price differ
/// - desired line with `id: None`: always an insert
/// - persisted item whose id no desired line carries: a delete
/// - desired line carrying an id that matches nothing: dropped - the edit
///   surface only ever echoes persisted ids back, so such a line is stale
///
/// An empty `desired` yields a plan that deletes every original and restores
/// all their stock; callers enforce the at-least-one-item rule on the sale
/// itself before reconciling.
pub fn reconcile(desired: &[LineInput], original: &[SaleItem]) -> ReconciliationPlan {
    let desired_ids: HashSet<&str> = desired
        .iter()
        .filter_map(|l| l.id.as_deref())
        .collect();

    let to_delete: Vec<SaleItem> = original
        .iter()
        .filter(|item| !desired_ids.contains(item.id.as_str()))
        .cloned()
        .collect();

    let mut to_update = Vec::new();
    let mut to_insert = Vec::new();

    for line in desired {
        match &line.id {
            Some(id) => {
                let Some(orig) = original.iter().find(|item| &item.id == id) else {
                    continue; // stale id, see doc comment
                };
                if line.quantity != orig.quantity
                    || line.unit_price_cents != orig.unit_price_cents
                {
                    to_update.push(ItemUpdate {
                        item_id: orig.id.clone(),
                        product_id: orig.product_id.clone(),
                        quantity: line.quantity,
                        unit_price_cents: line.unit_price_cents,
                        total_price_cents: line.total_price_cents(),
                        stock_delta: orig.quantity - line.quantity,
                    });
                }
            }
            None => to_insert.push(line.clone()),
        }
    }

    ReconciliationPlan {
        to_delete,
        to_update,
        to_insert,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn persisted(id: &str, product_id: &str, quantity: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id: id.to_string(),
            sale_id: "sale-1".to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents,
            total_price_cents: quantity * unit_price_cents,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_identical_sets_are_a_noop() {
        let original = vec![persisted("i1", "prod-a", 2, 1000)];
        let desired = vec![LineInput::persisted("i1", "prod-a", 2, 1000)];

        let plan = reconcile(&desired, &original);
        assert!(plan.is_noop());
        assert!(plan.stock_deltas().is_empty());
    }

    #[test]
    fn test_quantity_increase_updates_row_and_draws_stock() {
        // had qty 2, want qty 5 → update row, stock −3
        let original = vec![persisted("i1", "prod-a", 2, 1000)];
        let desired = vec![LineInput::persisted("i1", "prod-a", 5, 1000)];

        let plan = reconcile(&desired, &original);
        assert_eq!(plan.to_update.len(), 1);
        assert!(plan.to_delete.is_empty());
        assert!(plan.to_insert.is_empty());

        let update = &plan.to_update[0];
        assert_eq!(update.item_id, "i1");
        assert_eq!(update.quantity, 5);
        assert_eq!(update.total_price_cents, 5000);
        assert_eq!(update.stock_delta, -3);

        assert_eq!(plan.stock_deltas().get("prod-a"), Some(&-3));
    }

    #[test]
    fn test_quantity_decrease_returns_stock() {
        let original = vec![persisted("i1", "prod-a", 5, 1000)];
        let desired = vec![LineInput::persisted("i1", "prod-a", 2, 1000)];

        let plan = reconcile(&desired, &original);
        assert_eq!(plan.to_update[0].stock_delta, 3);
        assert_eq!(plan.stock_deltas().get("prod-a"), Some(&3));
    }

    #[test]
    fn test_removed_item_deleted_and_stock_restored() {
        // had A×2 and B×1, keep only A → delete B's row, stock B +1, A untouched
        let original = vec![
            persisted("i1", "prod-a", 2, 1000),
            persisted("i2", "prod-b", 1, 500),
        ];
        let desired = vec![LineInput::persisted("i1", "prod-a", 2, 1000)];

        let plan = reconcile(&desired, &original);
        assert_eq!(plan.to_delete.len(), 1);
        assert_eq!(plan.to_delete[0].id, "i2");
        assert!(plan.to_update.is_empty());
        assert!(plan.to_insert.is_empty());

        let deltas = plan.stock_deltas();
        assert_eq!(deltas.get("prod-b"), Some(&1));
        assert_eq!(deltas.get("prod-a"), None);
    }

    #[test]
    fn test_idless_line_is_always_an_insert() {
        // same product as a persisted row, but no id → insert, not update
        let original = vec![persisted("i1", "prod-a", 2, 1000)];
        let desired = vec![
            LineInput::persisted("i1", "prod-a", 2, 1000),
            LineInput::new("prod-a", 4, 900),
        ];

        let plan = reconcile(&desired, &original);
        assert!(plan.to_update.is_empty());
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.stock_deltas().get("prod-a"), Some(&-4));
    }

    #[test]
    fn test_price_only_change_updates_without_stock_effect() {
        let original = vec![persisted("i1", "prod-a", 2, 1000)];
        let desired = vec![LineInput::persisted("i1", "prod-a", 2, 1250)];

        let plan = reconcile(&desired, &original);
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].stock_delta, 0);
        assert_eq!(plan.to_update[0].total_price_cents, 2500);
        assert!(plan.stock_deltas().is_empty());
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let original = vec![
            persisted("i1", "prod-a", 2, 1000),
            persisted("i2", "prod-b", 3, 500),
        ];

        let plan = reconcile(&[], &original);
        assert_eq!(plan.to_delete.len(), 2);

        let deltas = plan.stock_deltas();
        assert_eq!(deltas.get("prod-a"), Some(&2));
        assert_eq!(deltas.get("prod-b"), Some(&3));
    }

    #[test]
    fn test_stale_id_is_dropped() {
        let original = vec![persisted("i1", "prod-a", 2, 1000)];
        let desired = vec![
            LineInput::persisted("i1", "prod-a", 2, 1000),
            LineInput::persisted("ghost", "prod-z", 9, 100),
        ];

        let plan = reconcile(&desired, &original);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_mixed_edit_nets_stock_per_product() {
        // delete A×2, re-add A×3 on a fresh line → net A: +2 − 3 = −1
        let original = vec![persisted("i1", "prod-a", 2, 1000)];
        let desired = vec![LineInput::new("prod-a", 3, 1000)];

        let plan = reconcile(&desired, &original);
        assert_eq!(plan.to_delete.len(), 1);
        assert_eq!(plan.to_insert.len(), 1);
        assert_eq!(plan.stock_deltas().get("prod-a"), Some(&-1));
    }

    #[test]
    fn test_offsetting_edit_yields_no_net_delta() {
        // swap which row carries which quantity; net per product is zero
        let original = vec![
            persisted("i1", "prod-a", 2, 1000),
            persisted("i2", "prod-a", 3, 1000),
        ];
        let desired = vec![
            LineInput::persisted("i1", "prod-a", 3, 1000),
            LineInput::persisted("i2", "prod-a", 2, 1000),
        ];

        let plan = reconcile(&desired, &original);
        assert_eq!(plan.to_update.len(), 2);
        assert!(plan.stock_deltas().is_empty());
    }
}
