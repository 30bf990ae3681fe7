//! Boundary to the relational store: reference lookups and transactional chunk writes.
//!
//! The traits are what the processor and the persister depend on; [`SqliteStore`] is the
//! production implementation.

use tracing::info;

use crate::{
    domain::{PurchaseOrder, ReferenceKind, ReferenceSet, ReferenceSets},
    error::{Error, reference_load_error},
};

mod sqlite;

pub use sqlite::{SeedReport, SqliteStore, SqliteWriter};

/// Source of the identifiers currently known to the store.
pub trait ReferenceSource {
    fn load_reference_set(&self, kind: ReferenceKind) -> Result<ReferenceSet, Error>;
}

/// Opens one independent connection per unit of work.
pub trait ConnectionFactory: Sync {
    type Connection: ChunkWriter;

    fn connect(&self) -> Result<Self::Connection, Error>;

    /// Largest chunk a single insert statement can carry, if the backend has such a limit
    fn max_chunk_rows(&self) -> Option<usize> {
        None
    }
}

/// A connection able to write purchase order lines inside an explicit transaction.
///
/// The persister drives the calls in the order `begin`, `insert`, `commit`, and calls
/// `rollback` if any of them fails.
pub trait ChunkWriter {
    fn begin(&mut self) -> Result<(), Error>;

    /// Writes all rows of the chunk with a single statement and returns the number written
    fn insert(&mut self, chunk: &[PurchaseOrder]) -> Result<usize, Error>;

    fn commit(&mut self) -> Result<(), Error>;

    fn rollback(&mut self) -> Result<(), Error>;
}

/// Loads the buyer and product snapshots for one run. Any failure is fatal to the run.
pub fn load_reference_sets(source: &impl ReferenceSource) -> Result<ReferenceSets, Error> {
    let buyers = load(source, ReferenceKind::Buyer)?;
    let products = load(source, ReferenceKind::Product)?;
    info!(
        buyers = buyers.len(),
        products = products.len(),
        "reference sets loaded"
    );
    Ok(ReferenceSets { buyers, products })
}

fn load(source: &impl ReferenceSource, kind: ReferenceKind) -> Result<ReferenceSet, Error> {
    source
        .load_reference_set(kind)
        .map_err(|e| reference_load_error(kind.table(), e))
}
