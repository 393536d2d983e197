//! Dump subsystem for docarchive
//!
//! Dump streams every document of a database into size-bounded tar
//! chunks on a storage backend.
//!
//! # Pipeline
//!
//! ```text
//! source ──▶ producer ──queue(N-1)──▶ worker 1..N ──▶ storage
//!               │                        │
//!               └──count──▶ coordinator ◀┘ reports
//! ```
//!
//! 1. The producer lists collections, skipping `system.*`
//! 2. Per collection it queues the index list, then every document
//! 3. Each worker packs records into its own chunk, committing on budget
//! 4. The coordinator tallies counts and reports until all settle
//!
//! Losing a sink is fatal and returns at once. A record that cannot be
//! written is logged and counted as failed; if the sink took part of it,
//! the chunk it was going into is abandoned and its entries count as
//! failed too.

mod config;
mod coordinator;
mod errors;
mod packer;
mod pool;

pub use config::{DumpConfig, MB};
pub use errors::{DumpError, DumpErrorCode, DumpResult, Severity};
pub use packer::{chunk_name, AbandonedChunk, ArchiveRecord, ChunkInfo, ChunkPacker, CHUNK_PREFIX};

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded};
use serde::Serialize;
use tracing::info;

use crate::database::DocumentSource;
use crate::file_storage::StorageTarget;
use crate::observability::{ObservationScope, Progress};

use coordinator::coordinate;
use pool::{run_producer, run_worker};

/// Outcome of a completed dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DumpSummary {
    /// Documents handed to workers
    pub documents: u64,
    /// Entries that could not be written
    pub failed: u64,
    /// Chunks committed
    pub chunks: u64,
    /// Largest queue length the producer observed
    pub max_queued: usize,
}

/// Entry point for dump runs
///
/// # Usage
///
/// ```ignore
/// let target = select_backend(&config.target, options)?;
/// let summary = DumpManager::run(&config, Box::new(source), target, &Progress::new(true))?;
/// ```
pub struct DumpManager;

impl DumpManager {
    /// Dump `source` into `target`
    ///
    /// # Errors
    ///
    /// Returns the first fatal `DumpError`:
    /// - Invalid configuration
    /// - Collections could not be listed
    /// - A chunk could not be opened or committed
    ///
    /// On a fatal error the remaining threads are not joined; they stop
    /// at their next send. A chunk in flight may be left uncommitted.
    pub fn run(
        config: &DumpConfig,
        source: Box<dyn DocumentSource>,
        target: StorageTarget,
        progress: &Progress,
    ) -> DumpResult<DumpSummary> {
        config.validate()?;

        let scope = ObservationScope::new("DUMP");
        info!(
            database = %source.name(),
            target = %config.target,
            concurrency = config.concurrency,
            chunk_size = config.chunk_size,
            "dumping"
        );

        let (queue_tx, queue_rx) = bounded(config.concurrency - 1);
        let (count_tx, count_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(config.concurrency);
        for n in 0..config.concurrency {
            let packer = ChunkPacker::new(target.backend.clone(), target.root.clone(), config.chunk_size);
            let queue = queue_rx.clone();
            let reports = report_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("dump-worker-{}", n))
                .spawn(move || run_worker(n, packer, queue, reports))
                .map_err(|e| DumpError::failed(format!("Could not start worker {}: {}", n, e)))?;
            workers.push(handle);
        }
        drop(queue_rx);

        let only = config.collection.clone();
        let producer = thread::Builder::new()
            .name("dump-producer".to_string())
            .spawn(move || run_producer(source.as_ref(), only.as_deref(), queue_tx, count_tx, report_tx))
            .map_err(|e| DumpError::failed(format!("Could not start producer: {}", e)))?;

        let tally = match coordinate(count_rx, report_rx, config.concurrency, progress) {
            Ok(tally) => tally,
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e);
            }
        };
        progress.finish();

        let max_queued = producer
            .join()
            .map_err(|_| DumpError::failed("Producer thread panicked"))?;
        for worker in workers {
            worker
                .join()
                .map_err(|_| DumpError::failed("Worker thread panicked"))?;
        }

        let summary = DumpSummary {
            documents: tally.documents,
            failed: tally.failed,
            chunks: tally.chunks,
            max_queued,
        };
        scope.complete(&format!(
            "{} documents in {} chunks, {} failed",
            summary.documents, summary.chunks, summary.failed
        ));
        Ok(summary)
    }
}
