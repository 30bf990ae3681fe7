//! Module defining the errors which are exposed to the users of the crate

/// Row-level decoding failures and validation failures are not errors: the former end up in the
/// unprocessable list, the latter in the invalid list. What remains here aborts a phase of the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the input failed as a whole (missing file, broken stream)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV reader or writer failed outside of a single row
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The store could not be reached or rejected a statement
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A reference set could not be loaded, which makes validation meaningless
    #[error("failed to load reference table {table}: {source}")]
    ReferenceLoad {
        table: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// The insert or commit of a single chunk failed; the chunk was rolled back
    #[error("transaction for chunk {chunk} rolled back: {source}")]
    Transaction {
        chunk: usize,
        #[source]
        source: Box<Error>,
    },

    /// At least one chunk of a persist run failed
    #[error("{failed} of {total} chunks failed to persist")]
    Persist { failed: usize, total: usize },

    /// Settings that cannot drive a run, e.g. a chunk size of zero
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub(crate) fn reference_load_error(table: &'static str, source: Error) -> Error {
    Error::ReferenceLoad {
        table,
        source: Box::new(source),
    }
}

pub(crate) fn transaction_error(chunk: usize, source: Error) -> Error {
    Error::Transaction {
        chunk,
        source: Box::new(source),
    }
}

pub(crate) fn config_error(message: impl Into<String>) -> Error {
    Error::Config(message.into())
}
