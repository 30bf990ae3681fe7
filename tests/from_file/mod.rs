//! Integration tests running the actual crate binary against files on disk: the full E2E path.

use std::path::Path;
use std::process::{Command, Output};

use crate::support::{fixture_path, generate_orders, reject_product_code};

fn po_loader(database: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_po-loader"))
        .arg("--database")
        .arg(database)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to execute binary")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "binary exited with non-zero status.\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("fixture paths are UTF-8")
}

#[test]
fn init_seed_and_process() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("orders.db");
    let buyers = fixture_path("buyers.csv");
    let products = fixture_path("products.csv");
    let input = fixture_path("purchase_orders.csv");
    let expected = std::fs::read_to_string(fixture_path("purchase_orders_expected.csv"))
        .expect("failed to read expected output fixture");

    assert_success(&po_loader(&database, &["init"]));
    assert_success(&po_loader(
        &database,
        &[
            "seed",
            "--buyers",
            path_str(&buyers),
            "--products",
            path_str(&products),
        ],
    ));
    let output = po_loader(&database, &["process", path_str(&input)]);
    assert_success(&output);

    let stdout = String::from_utf8(output.stdout).expect("binary output was not valid UTF-8");
    assert_eq!(stdout.trim_end(), expected.trim_end());

    let store = po_loader::SqliteStore::new(&database, std::time::Duration::from_secs(1));
    assert_eq!(store.count_purchase_order_lines().unwrap(), 3);
}

#[test]
fn failed_chunk_exits_with_error_after_writing_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("orders.db");
    let input = dir.path().join("orders.csv");
    let buyers = dir.path().join("buyers.csv");
    let products = dir.path().join("products.csv");

    let orders = generate_orders(30);
    let mut wtr = csv::Writer::from_path(&input).unwrap();
    for order in &orders {
        wtr.serialize(order).unwrap();
    }
    wtr.flush().unwrap();
    let buyer_lines: Vec<String> = (0..100).map(|i| format!("Buyer{i}")).collect();
    std::fs::write(&buyers, format!("BuyerId\n{}\n", buyer_lines.join("\n"))).unwrap();
    let product_lines: Vec<&str> = orders.iter().map(|o| o.product_code.as_str()).collect();
    std::fs::write(&products, format!("ProductCode\n{}\n", product_lines.join("\n"))).unwrap();

    assert_success(&po_loader(&database, &["init"]));
    assert_success(&po_loader(
        &database,
        &["seed", "--buyers", path_str(&buyers), "--products", path_str(&products)],
    ));
    let store = po_loader::SqliteStore::new(&database, std::time::Duration::from_secs(1));
    reject_product_code(&store, "PROD25");

    let output = po_loader(
        &database,
        &["process", path_str(&input), "--chunk-size", "10"],
    );

    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().filter(|l| l.starts_with("valid,")).count(), 30);
    assert_eq!(store.count_purchase_order_lines().unwrap(), 20);
}

#[test]
fn dry_run_leaves_the_database_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("orders.db");
    let buyers = fixture_path("buyers.csv");
    let products = fixture_path("products.csv");

    assert_success(&po_loader(&database, &["init"]));
    assert_success(&po_loader(
        &database,
        &["seed", "--buyers", path_str(&buyers), "--products", path_str(&products)],
    ));
    let output = po_loader(
        &database,
        &["process", path_str(&fixture_path("purchase_orders.csv")), "--dry-run"],
    );
    assert_success(&output);

    let store = po_loader::SqliteStore::new(&database, std::time::Duration::from_secs(1));
    assert_eq!(store.count_purchase_order_lines().unwrap(), 0);
}
