//! Helpers shared by the integration tests.

use std::{path::PathBuf, time::Duration};

use po_loader::{PurchaseOrder, SqliteStore};
use tempfile::TempDir;

/// Returns the absolute path to a test fixture file in `tests/data/`.
pub(crate) fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// A fresh database with the schema in place. Keep the directory alive as long as the store.
pub(crate) fn empty_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = SqliteStore::new(dir.path().join("orders.db"), Duration::from_secs(10));
    store.init_schema().expect("failed to create schema");
    (dir, store)
}

/// A database seeded with the buyers and products fixtures.
pub(crate) fn seeded_store() -> (TempDir, SqliteStore) {
    let (dir, store) = empty_store();
    store
        .seed_from_files(fixture_path("buyers.csv"), fixture_path("products.csv"))
        .expect("failed to seed reference data");
    (dir, store)
}

/// `count` distinct orders with product codes `PROD0..PROD{count-1}`.
pub(crate) fn generate_orders(count: usize) -> Vec<PurchaseOrder> {
    (0..count)
        .map(|i| PurchaseOrder {
            buyer_id: format!("Buyer{}", i % 100),
            order_date: "2024-01-01".to_string(),
            product_code: format!("PROD{i}"),
            quantity: i as i32 + 1,
        })
        .collect()
}

/// Makes every insert of `product_code` abort, which rolls back the chunk containing it.
pub(crate) fn reject_product_code(store: &SqliteStore, product_code: &str) {
    let conn = rusqlite::Connection::open(store.path()).expect("failed to open database");
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_{product_code} BEFORE INSERT ON PurchaseOrderLines
         WHEN NEW.ProductCode = '{product_code}'
         BEGIN SELECT RAISE(ABORT, 'rejected product code'); END;"
    ))
    .expect("failed to create trigger");
}
