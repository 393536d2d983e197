//! Restore subsystem for docarchive
//!
//! Restore loads every chunk under an archive root back into a database.
//!
//! # Algorithm
//!
//! 1. Walk the archive root, one chunk at a time
//! 2. Per chunk, read tar entries until the end-of-archive marker
//! 3. Insert each document entry's bytes unchanged
//! 4. Record each `indexes.json` entry, rejecting duplicates
//! 5. After the last chunk, apply indexes collection by collection
//!
//! # Important
//!
//! Restore is sequential.
//! Every error is fatal and stops the restore at once.
//! Nothing inserted before a failure is rolled back.

mod config;
mod errors;
mod extractor;
mod restorer;

pub use config::RestoreConfig;
pub use errors::{RestoreError, RestoreErrorCode, RestoreResult, Severity};
pub use extractor::{read_entries, ChunkEntry};
pub use restorer::{AppliedIndexes, IndexPlan};

use serde::Serialize;
use tracing::{debug, info};

use crate::database::DocumentTarget;
use crate::file_storage::{StorageError, StorageTarget};
use crate::observability::{Event, ObservationScope, Progress};

/// Outcome of a completed restore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    /// Chunks read
    pub chunks: u64,
    /// Documents inserted
    pub documents: u64,
    /// Collections that had indexes applied
    pub collections_indexed: usize,
    /// Index definitions applied
    pub indexes_applied: usize,
}

/// Entry point for restore runs
///
/// # Usage
///
/// ```ignore
/// let source = select_backend(&config.source, options)?;
/// let summary = RestoreManager::run(&config, &mut database, source, &Progress::new(true))?;
/// ```
pub struct RestoreManager;

impl RestoreManager {
    /// Restore every chunk under `source` into `target`
    ///
    /// # Errors
    ///
    /// Returns `RestoreError` on any failure:
    /// - Archive root cannot be listed, or a chunk cannot be read
    /// - An entry name is malformed
    /// - A collection has two index entries
    /// - The destination rejects a document or an index
    pub fn run(
        config: &RestoreConfig,
        target: &mut dyn DocumentTarget,
        source: StorageTarget,
        progress: &Progress,
    ) -> RestoreResult<RestoreSummary> {
        config.validate()?;

        let scope = ObservationScope::new("RESTORE");
        info!(source = %config.source, database = %target.name(), "restoring");

        match Self::restore_inner(config, target, &source, progress) {
            Ok(summary) => {
                progress.finish();
                scope.complete(&format!(
                    "{} documents from {} chunks, {} indexes",
                    summary.documents, summary.chunks, summary.indexes_applied
                ));
                Ok(summary)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn restore_inner(
        config: &RestoreConfig,
        target: &mut dyn DocumentTarget,
        source: &StorageTarget,
        progress: &Progress,
    ) -> RestoreResult<RestoreSummary> {
        let mut summary = RestoreSummary::default();
        let mut plan = IndexPlan::new();
        let mut failure: Option<RestoreError> = None;

        let walked = source.backend.walk(&source.root, &mut |path, err| {
            if let Some(e) = err {
                return Err(e);
            }
            match Self::restore_chunk(config, target, source, path, &mut plan, &mut summary, progress) {
                Ok(()) => Ok(()),
                Err(e) => {
                    let message = e.to_string();
                    failure = Some(e);
                    Err(StorageError::WalkAborted(message))
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        walked.map_err(|e| RestoreError::storage(format!("Could not walk {}", source.root), e))?;

        let applied = plan.apply(target)?;
        summary.collections_indexed = applied.collections;
        summary.indexes_applied = applied.indexes;
        Ok(summary)
    }

    fn restore_chunk(
        config: &RestoreConfig,
        target: &mut dyn DocumentTarget,
        source: &StorageTarget,
        path: &str,
        plan: &mut IndexPlan,
        summary: &mut RestoreSummary,
        progress: &Progress,
    ) -> RestoreResult<()> {
        let reader = source
            .backend
            .fetch(path)
            .map_err(|e| RestoreError::storage(format!("Could not fetch {}", path), e))?;

        let entries = read_entries(path, reader, |entry| match entry {
            ChunkEntry::Document { collection, id, raw } => {
                target
                    .insert(&collection, raw)
                    .map_err(|e| RestoreError::insert(&collection, e))?;
                summary.documents += 1;
                progress.set(summary.documents);
                debug!(collection = %collection, id = %id, "inserted");
                Ok(())
            }
            ChunkEntry::Indexes { collection, payload } => {
                if config.indexes {
                    plan.record(&collection, &payload)
                } else {
                    Ok(())
                }
            }
        })?;

        summary.chunks += 1;
        info!(event = %Event::ChunkRestored, path = %path, entries);
        Ok(())
    }
}
