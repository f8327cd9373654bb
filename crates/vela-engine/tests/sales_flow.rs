//! End-to-end tests for the sale transaction engine against an in-memory
//! database: totals, stock movement, reconciliation-driven edits, partial
//! failure policy and customer resolution.

use chrono::{Duration, Utc};
use vela_core::{LineInput, PaymentMethod, Product, SaleTotals, TaxRate};
use vela_db::repository::product::generate_product_id;
use vela_db::{Database, DbConfig, SaleFilter};
use vela_engine::{
    Change, CustomerInput, EngineConfig, EngineError, SaleDetail, SaleRevision, SaleSubmission,
    SalesEngine, StockPolicy,
};

// =============================================================================
// Helpers
// =============================================================================

const TAX_BPS: u32 = 500; // 5%

async fn engine_with(policy: StockPolicy) -> SalesEngine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let config = EngineConfig::new(TaxRate::from_bps(TAX_BPS)).stock_policy(policy);
    SalesEngine::new(db, config)
}

async fn engine() -> SalesEngine {
    engine_with(StockPolicy::Strict).await
}

async fn seed_product(engine: &SalesEngine, name: &str, price_cents: i64, stock: i64) -> String {
    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        name: name.to_string(),
        reference_number: None,
        price_cents,
        stock,
        created_at: now,
        updated_at: now,
    };
    engine.database().products().insert(&product).await.unwrap();
    product.id
}

async fn stock_of(engine: &SalesEngine, product_id: &str) -> i64 {
    engine
        .database()
        .products()
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

fn submission() -> SaleSubmission {
    SaleSubmission {
        customer: CustomerInput::new("Asha Rao", "9876543210"),
        payment_method: PaymentMethod::Cash,
        occurred_at: None,
    }
}

/// A revision that keeps the customer and recomputes totals from the
/// desired lines, the way an edit screen does before submitting.
fn revision_for(desired: &[LineInput]) -> SaleRevision {
    SaleRevision {
        customer: CustomerInput::new("Asha Rao", "9876543210"),
        payment_method: PaymentMethod::Cash,
        occurred_at: Utc::now(),
        totals: SaleTotals::from_lines(desired, TaxRate::from_bps(TAX_BPS)),
    }
}

/// Desired lines reproducing the persisted state, and the original items,
/// as an editor would load them.
fn editor_state(detail: &SaleDetail) -> (Vec<LineInput>, Vec<vela_core::SaleItem>) {
    let original: Vec<vela_core::SaleItem> = detail
        .items
        .iter()
        .cloned()
        .map(|d| d.into_item())
        .collect();
    let desired = original.iter().map(LineInput::from_item).collect();
    (desired, original)
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_sale_computes_totals_and_decrements_stock() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    // cart [{productA, qty 2, price 10.00}], tax 5%
    let result = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();

    let sale = &result.detail.sale;
    assert_eq!(sale.subtotal_cents, 2000);
    assert_eq!(sale.tax_cents, 100);
    assert_eq!(sale.total_cents, 2100);
    assert_eq!(sale.total_cents, sale.subtotal_cents + sale.tax_cents);
    assert!(sale.invoice_number.starts_with("INV-"));

    assert_eq!(result.detail.items.len(), 1);
    assert_eq!(result.detail.items[0].quantity, 2);
    assert_eq!(result.detail.items[0].total_price_cents, 2000);
    assert!(result.stock_warnings.is_empty());

    // stock before − quantity
    assert_eq!(stock_of(&engine, &product_a).await, 8);
}

#[tokio::test]
async fn create_sale_rejects_empty_cart_with_no_side_effects() {
    let engine = engine().await;

    let err = engine.create_sale(submission(), vec![]).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // rejected before any write: not even the customer exists
    assert_eq!(engine.database().customers().count().await.unwrap(), 0);
}

#[tokio::test]
async fn create_sale_strict_rolls_back_on_insufficient_stock() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;
    let product_b = seed_product(&engine, "Notebook", 5000, 1).await;

    let err = engine
        .create_sale(
            submission(),
            vec![
                LineInput::new(&product_a, 2, 1000),
                LineInput::new(&product_b, 3, 5000), // only 1 on hand
            ],
        )
        .await
        .unwrap_err();

    match err {
        EngineError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(available, 1);
            assert_eq!(requested, 3);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // the whole transaction rolled back: no sale, both stocks untouched
    assert!(engine
        .list_sales(&SaleFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(stock_of(&engine, &product_a).await, 10);
    assert_eq!(stock_of(&engine, &product_b).await, 1);
}

#[tokio::test]
async fn create_sale_unknown_product_fails() {
    let engine = engine().await;

    let err = engine
        .create_sale(submission(), vec![LineInput::new("ghost", 1, 100)])
        .await
        .unwrap_err();

    // the line-item insert trips the foreign key before stock is touched
    assert!(matches!(
        err,
        EngineError::Storage(_) | EngineError::ProductNotFound(_)
    ));
    assert!(engine
        .list_sales(&SaleFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn repeat_sales_same_phone_reuse_one_customer() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let first = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 1, 1000)])
        .await
        .unwrap();

    // same phone, different formatting
    let second = engine
        .create_sale(
            SaleSubmission {
                customer: CustomerInput::new("Asha Rao", "98765 43210"),
                payment_method: PaymentMethod::Upi,
                occurred_at: None,
            },
            vec![LineInput::new(&product_a, 1, 1000)],
        )
        .await
        .unwrap();

    assert_eq!(first.detail.customer.id, second.detail.customer.id);
    assert_eq!(engine.database().customers().count().await.unwrap(), 1);
}

#[tokio::test]
async fn create_sale_emits_change_events() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;
    let mut feed = engine.subscribe();

    engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 1, 1000)])
        .await
        .unwrap();

    assert_eq!(feed.recv().await.unwrap(), Change::Sales);
    assert_eq!(feed.recv().await.unwrap(), Change::Products);
    assert_eq!(feed.recv().await.unwrap(), Change::Customers);
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn update_quantity_increase_draws_additional_stock() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &product_a).await, 8);

    // edit qty 2 → 5: update row id, additional decrement of 3
    let (mut desired, original) = editor_state(&created.detail);
    desired[0].quantity = 5;

    let updated = engine
        .update_sale(
            &created.detail.sale.id,
            revision_for(&desired),
            desired.clone(),
            original,
        )
        .await
        .unwrap();

    assert_eq!(updated.detail.items.len(), 1);
    assert_eq!(updated.detail.items[0].id, created.detail.items[0].id);
    assert_eq!(updated.detail.items[0].quantity, 5);
    assert_eq!(updated.detail.sale.subtotal_cents, 5000);
    assert_eq!(updated.detail.sale.total_cents, 5250);

    assert_eq!(stock_of(&engine, &product_a).await, 5);
}

#[tokio::test]
async fn update_removing_item_restores_its_stock() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;
    let product_b = seed_product(&engine, "Notebook", 500, 10).await;

    let created = engine
        .create_sale(
            submission(),
            vec![
                LineInput::new(&product_a, 2, 1000),
                LineInput::new(&product_b, 1, 500),
            ],
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &product_a).await, 8);
    assert_eq!(stock_of(&engine, &product_b).await, 9);

    // keep only the product A line
    let (desired, original) = editor_state(&created.detail);
    let desired: Vec<LineInput> = desired
        .into_iter()
        .filter(|l| l.product_id == product_a)
        .collect();

    let updated = engine
        .update_sale(
            &created.detail.sale.id,
            revision_for(&desired),
            desired,
            original,
        )
        .await
        .unwrap();

    assert_eq!(updated.detail.items.len(), 1);
    assert_eq!(updated.detail.items[0].product_id, product_a);

    // product B restored, product A untouched
    assert_eq!(stock_of(&engine, &product_b).await, 10);
    assert_eq!(stock_of(&engine, &product_a).await, 8);
}

#[tokio::test]
async fn update_adding_line_decrements_stock() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;
    let product_b = seed_product(&engine, "Notebook", 500, 10).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();

    let (mut desired, original) = editor_state(&created.detail);
    desired.push(LineInput::new(&product_b, 4, 500));

    let updated = engine
        .update_sale(
            &created.detail.sale.id,
            revision_for(&desired),
            desired,
            original,
        )
        .await
        .unwrap();

    assert_eq!(updated.detail.items.len(), 2);
    assert_eq!(stock_of(&engine, &product_b).await, 6);
    assert_eq!(updated.detail.sale.subtotal_cents, 4000);
}

#[tokio::test]
async fn update_with_unchanged_items_moves_no_stock() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();
    let stock_after_create = stock_of(&engine, &product_a).await;

    // first edit: qty 2 → 3
    let (mut desired, original) = editor_state(&created.detail);
    desired[0].quantity = 3;
    let first = engine
        .update_sale(
            &created.detail.sale.id,
            revision_for(&desired),
            desired,
            original,
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &product_a).await, stock_after_create - 1);

    // second edit with identical desired set: zero further stock change
    let (desired, original) = editor_state(&first.detail);
    engine
        .update_sale(
            &first.detail.sale.id,
            revision_for(&desired),
            desired,
            original,
        )
        .await
        .unwrap();

    assert_eq!(stock_of(&engine, &product_a).await, stock_after_create - 1);
}

#[tokio::test]
async fn update_revises_header_fields() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();

    let (desired, original) = editor_state(&created.detail);
    let back_dated = Utc::now() - Duration::days(3);
    let revision = SaleRevision {
        customer: CustomerInput::new("Asha Rao", "9876543210"),
        payment_method: PaymentMethod::Card,
        occurred_at: back_dated,
        totals: SaleTotals::from_lines(&desired, TaxRate::from_bps(TAX_BPS)),
    };

    let updated = engine
        .update_sale(&created.detail.sale.id, revision, desired, original)
        .await
        .unwrap();

    let sale = &updated.detail.sale;
    assert_eq!(sale.payment_method, PaymentMethod::Card);
    assert_eq!(sale.occurred_at, back_dated);
    // invoice number never changes on edit
    assert_eq!(sale.invoice_number, created.detail.sale.invoice_number);
}

#[tokio::test]
async fn update_rejects_empty_desired_set() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();

    let (_, original) = editor_state(&created.detail);
    let err = engine
        .update_sale(
            &created.detail.sale.id,
            revision_for(&[]),
            vec![],
            original,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)));
    // nothing moved
    assert_eq!(stock_of(&engine, &product_a).await, 8);
}

#[tokio::test]
async fn update_unknown_sale_is_not_found() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let desired = vec![LineInput::new(&product_a, 1, 1000)];
    let err = engine
        .update_sale("no-such-sale", revision_for(&desired), desired.clone(), vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::SaleNotFound(_)));
}

#[tokio::test]
async fn update_strict_rolls_back_entirely_on_overdraw() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 4).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &product_a).await, 2);

    // qty 2 → 9 needs 7 more; only 2 on hand
    let (mut desired, original) = editor_state(&created.detail);
    desired[0].quantity = 9;

    let err = engine
        .update_sale(
            &created.detail.sale.id,
            revision_for(&desired),
            desired,
            original,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock { .. }));

    // header AND row AND stock all rolled back together
    let reread = engine
        .get_sale_by_invoice_number(&created.detail.sale.invoice_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reread.sale.subtotal_cents, 2000);
    assert_eq!(reread.items[0].quantity, 2);
    assert_eq!(stock_of(&engine, &product_a).await, 2);
}

#[tokio::test]
async fn best_effort_commits_rows_and_reports_stock_warning() {
    let engine = engine_with(StockPolicy::BestEffort).await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 4).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();
    assert!(created.stock_warnings.is_empty());

    let (mut desired, original) = editor_state(&created.detail);
    desired[0].quantity = 9; // needs 7 more, only 2 on hand

    let updated = engine
        .update_sale(
            &created.detail.sale.id,
            revision_for(&desired),
            desired,
            original,
        )
        .await
        .unwrap();

    // the row write stands, the failed decrement is reported, stock is
    // untouched (never driven negative)
    assert_eq!(updated.detail.items[0].quantity, 9);
    assert_eq!(updated.stock_warnings.len(), 1);
    assert_eq!(updated.stock_warnings[0].product_id, product_a);
    assert_eq!(stock_of(&engine, &product_a).await, 2);
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn get_sale_by_invoice_number_joins_customer_and_stock() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 2, 1000)])
        .await
        .unwrap();

    let detail = engine
        .get_sale_by_invoice_number(&created.detail.sale.invoice_number)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(detail.sale.id, created.detail.sale.id);
    assert_eq!(detail.customer.name, "Asha Rao");
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].product_name, "Blue Pen");
    // live stock, post-sale
    assert_eq!(detail.items[0].product_stock, 8);

    assert!(engine
        .get_sale_by_invoice_number("INV-unknown")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn list_sales_filters_by_invoice_fragment() {
    let engine = engine().await;
    let product_a = seed_product(&engine, "Blue Pen", 1000, 10).await;

    let created = engine
        .create_sale(submission(), vec![LineInput::new(&product_a, 1, 1000)])
        .await
        .unwrap();

    let fragment = created
        .detail
        .sale
        .invoice_number
        .trim_start_matches("INV-")
        .to_string();

    let hits = engine
        .list_sales(&SaleFilter {
            invoice_number_contains: Some(fragment),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    let by_customer = engine
        .list_sales(&SaleFilter {
            customer_id: Some(created.detail.customer.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_customer.len(), 1);
}
