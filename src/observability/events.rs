//! Observability events for docarchive
//!
//! Log lines carry an `event` field naming one of these. Begin, complete
//! and failure of a whole run come from `ObservationScope`.

use std::fmt;

/// Observable events during dump and restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Storage backend selected for a target
    StorageSelected,

    // Dump
    /// A worker opened a new chunk
    ChunkOpened,
    /// A chunk was finalized and committed
    ChunkCommitted,
    /// A chunk was dropped uncommitted after a failed write
    ChunkAbandoned,
    /// A single record could not be written
    RecordFailed,
    /// The source cursor reported an error
    SourceError,
    /// A worker drained the queue and exited
    WorkerFinished,

    // Restore
    /// One chunk fully restored
    ChunkRestored,
    /// Index definition recorded for a collection
    IndexesRecorded,
    /// Indexes applied to a collection
    IndexesApplied,

    // Storage
    /// Remote listing only returned its first page
    ListingTruncated,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StorageSelected => "STORAGE_SELECTED",

            Event::ChunkOpened => "CHUNK_OPENED",
            Event::ChunkCommitted => "CHUNK_COMMITTED",
            Event::ChunkAbandoned => "CHUNK_ABANDONED",
            Event::RecordFailed => "RECORD_FAILED",
            Event::SourceError => "SOURCE_ERROR",
            Event::WorkerFinished => "WORKER_FINISHED",

            Event::ChunkRestored => "CHUNK_RESTORED",
            Event::IndexesRecorded => "INDEXES_RECORDED",
            Event::IndexesApplied => "INDEXES_APPLIED",

            Event::ListingTruncated => "LISTING_TRUNCATED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
