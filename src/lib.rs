mod config;
mod domain;
mod error;
mod input;
mod output;
mod persist;
mod processor;
mod store;
mod telemetry;
mod validation;

pub use config::{Cli, Command, RunSettings};
pub use domain::{
    Buyer, ProcessingResult, Product, PurchaseOrder, ReferenceKind, ReferenceSet, ReferenceSets,
    Verdict,
};
pub use error::Error;
pub use input::{FileReadResult, read_file, read_records};
pub use output::{ReportRow, RowStatus, to_report_rows, write_report};
pub use persist::{
    BatchPersister, ChunkOutcome, ChunkState, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_IN_FLIGHT,
    PersistReport, PersistSettings,
};
pub use processor::OrderProcessor;
pub use store::{
    ChunkWriter, ConnectionFactory, ReferenceSource, SeedReport, SqliteStore, SqliteWriter,
    load_reference_sets,
};
pub use telemetry::{LogFormat, setup_logging};
pub use validation::{RecordValidator, Validator};

/// What a processing run produced
#[derive(Debug)]
pub struct RunSummary {
    pub result: ProcessingResult,
    /// `None` for dry runs
    pub persisted: Option<PersistReport>,
}

impl RunSummary {
    /// True unless a chunk failed to persist
    pub fn is_success(&self) -> bool {
        self.persisted
            .as_ref()
            .is_none_or(PersistReport::is_success)
    }
}

/// Runs the purchase order pipeline against a SQLite database.
///
/// The reference sets are loaded once, before the file is read; failing to load them aborts the
/// run. The file is then partitioned into valid, invalid and unprocessable rows, and the valid
/// rows are written in chunks (skipped for dry runs).
///
/// # Error handling
///
/// Row-level problems never surface as errors: they are part of the returned
/// [`ProcessingResult`]. A failing chunk does not abort the run either; it is reported in the
/// [`PersistReport`] next to the chunks that committed.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use po_loader::{PersistSettings, RunSettings, run, write_report};
///
/// let settings = RunSettings {
///     database: "orders.db".into(),
///     busy_timeout: Duration::from_secs(5),
///     input: "purchase_orders.csv".into(),
///     persist: PersistSettings::default(),
///     dry_run: false,
/// };
/// let summary = run(&settings).unwrap();
/// write_report(&summary.result, std::io::stdout()).unwrap();
/// ```
pub fn run(settings: &RunSettings) -> Result<RunSummary, Error> {
    let store = SqliteStore::new(&settings.database, settings.busy_timeout);
    let persister = BatchPersister::new(store.clone(), settings.persist)?;

    let references = load_reference_sets(&store)?;
    let processor = OrderProcessor::new(Validator::new(references));
    let result = processor.process_file(&settings.input)?;

    let persisted = if settings.dry_run {
        tracing::info!(valid = result.valid.len(), "dry run, nothing persisted");
        None
    } else {
        Some(persister.persist(&result.valid))
    };

    Ok(RunSummary { result, persisted })
}
