//! Integration tests writing chunks to an on-disk SQLite database

use claims::{assert_matches, assert_ok};
use po_loader::{BatchPersister, ChunkState, Error, PersistSettings};
use rstest::rstest;

use crate::support::{empty_store, generate_orders, reject_product_code};

#[rstest]
#[case::empty(0, 0)]
#[case::single_chunk(10, 1)]
#[case::exactly_one_chunk(5000, 1)]
#[case::one_over(5001, 2)]
#[case::three_chunks(12_345, 3)]
fn all_rows_are_persisted(#[case] count: usize, #[case] expected_chunks: usize) {
    let (_dir, store) = empty_store();
    let records = generate_orders(count);
    let persister = assert_ok!(BatchPersister::new(store.clone(), PersistSettings::default()));

    let report = persister.persist(&records);

    assert!(report.is_success(), "failed chunks: {:?}", report.chunks);
    assert_eq!(report.chunks.len(), expected_chunks);
    assert_eq!(assert_ok!(store.count_purchase_order_lines()), count);
}

#[test]
fn persisted_rows_keep_input_order_within_chunks() {
    let (_dir, store) = empty_store();
    let records = generate_orders(25);
    let settings = PersistSettings {
        chunk_size: 10,
        max_in_flight: 1,
    };
    let persister = assert_ok!(BatchPersister::new(store.clone(), settings));

    let report = persister.persist(&records);

    assert!(report.is_success());
    assert_eq!(assert_ok!(store.purchase_order_lines()), records);
}

#[test]
fn failed_second_chunk_leaves_first_chunk_committed() {
    let (_dir, store) = empty_store();
    reject_product_code(&store, "PROD5000");
    let records = generate_orders(5001);
    let persister = assert_ok!(BatchPersister::new(store.clone(), PersistSettings::default()));

    let report = persister.persist(&records);

    assert_eq!(report.chunks[0].state, ChunkState::Committed);
    assert_eq!(report.chunks[1].state, ChunkState::RolledBack);
    assert_matches!(
        &report.chunks[1].error,
        Some(Error::Transaction { chunk: 1, .. })
    );
    assert_eq!(assert_ok!(store.purchase_order_lines()), records[..5000]);
    assert_matches!(
        report.into_result(),
        Err(Error::Persist {
            failed: 1,
            total: 2
        })
    );
}

#[test]
fn failing_chunk_in_the_middle_does_not_cancel_its_siblings() {
    let (_dir, store) = empty_store();
    reject_product_code(&store, "PROD15");
    let records = generate_orders(40);
    let settings = PersistSettings {
        chunk_size: 10,
        max_in_flight: 4,
    };
    let persister = assert_ok!(BatchPersister::new(store.clone(), settings));

    let report = persister.persist(&records);

    let states: Vec<ChunkState> = report.chunks.iter().map(|c| c.state).collect();
    assert_eq!(
        states,
        vec![
            ChunkState::Committed,
            ChunkState::RolledBack,
            ChunkState::Committed,
            ChunkState::Committed,
        ]
    );
    assert_eq!(report.rows_committed(), 30);
    assert_eq!(assert_ok!(store.count_purchase_order_lines()), 30);
}

#[test]
fn missing_database_fails_the_chunk_instead_of_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let store = po_loader::SqliteStore::new(
        dir.path().join("missing.db"),
        std::time::Duration::from_millis(10),
    );
    let persister = assert_ok!(BatchPersister::new(store, PersistSettings::default()));

    let report = persister.persist(&generate_orders(3));

    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.rows_committed(), 0);
}

#[rstest]
#[case::at_the_limit(8191, true)]
#[case::over_the_limit(8192, false)]
fn chunk_size_is_checked_against_the_sqlite_statement_limit(
    #[case] chunk_size: usize,
    #[case] accepted: bool,
) {
    let (_dir, store) = empty_store();
    let settings = PersistSettings {
        chunk_size,
        ..PersistSettings::default()
    };

    let persister = BatchPersister::new(store, settings);

    assert_eq!(persister.is_ok(), accepted);
}
