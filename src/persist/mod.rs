//! Module writing valid purchase orders to the store in bounded, transactional chunks.
//!
//! Every chunk is its own unit of work: it opens its own connection, runs one transaction and
//! ends either committed or rolled back. Chunks already committed stay committed when a sibling
//! fails; the failure is reported, never retried.

use std::{
    sync::mpsc::{Receiver, sync_channel},
    thread::{Scope, ScopedJoinHandle},
};

use tracing::{debug, info, info_span, warn};

use crate::{
    domain::PurchaseOrder,
    error::{Error, config_error, transaction_error},
    store::{ChunkWriter, ConnectionFactory},
};


pub const DEFAULT_CHUNK_SIZE: usize = 5000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistSettings {
    /// Upper bound on the rows written by one transaction
    pub chunk_size: usize,
    /// Upper bound on chunks being written at the same time
    pub max_in_flight: usize,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Lifecycle of a single chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InTransaction,
    Committed,
    RolledBack,
}

#[derive(Debug)]
pub struct ChunkOutcome {
    /// Position of the chunk in the input, starting at 0
    pub index: usize,
    pub rows: usize,
    pub state: ChunkState,
    pub error: Option<Error>,
}

impl ChunkOutcome {
    pub fn is_committed(&self) -> bool {
        self.state == ChunkState::Committed
    }
}

/// Outcomes of all chunks of one persist run, ordered by chunk index.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub chunks: Vec<ChunkOutcome>,
}

impl PersistReport {
    /// True if every chunk committed. An empty report is a success.
    pub fn is_success(&self) -> bool {
        self.chunks.iter().all(ChunkOutcome::is_committed)
    }

    pub fn rows_committed(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.is_committed())
            .map(|c| c.rows)
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.chunks.iter().filter(|c| !c.is_committed())
    }

    /// Collapses the report into the number of committed rows, or an error counting the failed chunks.
    pub fn into_result(self) -> Result<usize, Error> {
        let failed = self.failures().count();
        if failed == 0 {
            Ok(self.rows_committed())
        } else {
            Err(Error::Persist {
                failed,
                total: self.chunks.len(),
            })
        }
    }
}

pub struct BatchPersister<F> {
    factory: F,
    settings: PersistSettings,
}

impl<F: ConnectionFactory> BatchPersister<F> {
    pub fn new(factory: F, settings: PersistSettings) -> Result<Self, Error> {
        if settings.chunk_size == 0 {
            return Err(config_error("chunk size must be at least 1"));
        }
        if settings.max_in_flight == 0 {
            return Err(config_error("the number of chunks in flight must be at least 1"));
        }
        if let Some(limit) = factory
            .max_chunk_rows()
            .filter(|&limit| settings.chunk_size > limit)
        {
            return Err(config_error(format!(
                "chunk size {} exceeds the store limit of {limit} rows per statement",
                settings.chunk_size
            )));
        }
        Ok(Self { factory, settings })
    }

    ///
    /// Writes `records` in consecutive chunks of at most `chunk_size` rows, preserving their order.
    /// A single chunk is written on the calling thread; several chunks are fanned out to at most
    /// `max_in_flight` worker threads and the call returns once all of them finished.
    ///
    pub fn persist(&self, records: &[PurchaseOrder]) -> PersistReport {
        if records.is_empty() {
            debug!("nothing to persist");
            return PersistReport::default();
        }

        let chunks: Vec<&[PurchaseOrder]> = records.chunks(self.settings.chunk_size).collect();
        let outcomes = if chunks.len() == 1 {
            vec![persist_chunk(&self.factory, 0, chunks[0])]
        } else {
            self.persist_parallel(&chunks)
        };

        let report = PersistReport { chunks: outcomes };
        info!(
            chunks = report.chunks.len(),
            rows_committed = report.rows_committed(),
            failed_chunks = report.failures().count(),
            "purchase orders persisted"
        );
        report
    }

    fn persist_parallel(&self, chunks: &[&[PurchaseOrder]]) -> Vec<ChunkOutcome> {
        let num_workers = self.settings.max_in_flight.min(chunks.len());

        std::thread::scope(|s| {
            let mut worker_senders = Vec::with_capacity(num_workers);
            let mut worker_handles = Vec::with_capacity(num_workers);
            for _ in 0..num_workers {
                let (chunk_tx, chunk_rx) = sync_channel(chunks.len());
                worker_senders.push(chunk_tx);
                worker_handles.push(spawn_worker(s, &self.factory, chunk_rx));
            }

            // Chunks are dealt round-robin; each worker writes its share one chunk at a time
            for (index, chunk) in chunks.iter().enumerate() {
                // Send fails only if the worker panicked; the join() below surfaces that panic.
                let _ = worker_senders[index % num_workers].send((index, *chunk));
            }
            drop(worker_senders);

            let mut outcomes: Vec<ChunkOutcome> = Vec::with_capacity(chunks.len());
            for handle in worker_handles {
                let partition = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                outcomes.extend(partition);
            }
            outcomes.sort_by_key(|outcome| outcome.index);
            outcomes
        })
    }
}

fn spawn_worker<'s, 'e, F: ConnectionFactory>(
    s: &'s Scope<'s, 'e>,
    factory: &'e F,
    chunk_rx: Receiver<(usize, &'e [PurchaseOrder])>,
) -> ScopedJoinHandle<'s, Vec<ChunkOutcome>> {
    s.spawn(move || {
        chunk_rx
            .into_iter()
            .map(|(index, chunk)| persist_chunk(factory, index, chunk))
            .collect()
    })
}

fn persist_chunk<F: ConnectionFactory>(
    factory: &F,
    index: usize,
    chunk: &[PurchaseOrder],
) -> ChunkOutcome {
    let span = info_span!("chunk", index, rows = chunk.len());
    let _guard = span.enter();

    let mut state = ChunkState::Pending;
    let result = factory.connect().and_then(|mut conn| {
        write_chunk(&mut conn, chunk, &mut state).inspect_err(|_| {
            if state == ChunkState::InTransaction {
                if let Err(err) = conn.rollback() {
                    warn!(error = %err, "rollback failed, the connection is discarded");
                }
            }
        })
    });

    match result {
        Ok(rows) => {
            transition(&mut state, ChunkState::Committed);
            ChunkOutcome {
                index,
                rows,
                state,
                error: None,
            }
        }
        Err(err) => {
            transition(&mut state, ChunkState::RolledBack);
            warn!(error = %err, "chunk rolled back");
            ChunkOutcome {
                index,
                rows: chunk.len(),
                state,
                error: Some(transaction_error(index, err)),
            }
        }
    }
}

fn write_chunk<W: ChunkWriter>(
    conn: &mut W,
    chunk: &[PurchaseOrder],
    state: &mut ChunkState,
) -> Result<usize, Error> {
    conn.begin()?;
    transition(state, ChunkState::InTransaction);
    let rows = conn.insert(chunk)?;
    conn.commit()?;
    Ok(rows)
}

fn transition(state: &mut ChunkState, next: ChunkState) {
    debug!(from = ?*state, to = ?next, "chunk state change");
    *state = next;
}
