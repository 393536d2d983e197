//! Producer and chunk writers
//!
//! The producer streams records into a bounded queue and signals every
//! document on the count channel. Each worker owns one packer and reports
//! every record, every committed chunk and its own exit on the report
//! channel, in that order.

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use super::errors::{DumpError, DumpResult};
use super::packer::{AbandonedChunk, ArchiveRecord, ChunkInfo, ChunkPacker};
use crate::database::{is_system_collection, DocumentSource};
use crate::document::IndexSpec;
use crate::observability::Event;

/// Worker to coordinator messages
#[derive(Debug)]
pub enum Report {
    /// Outcome of one record
    Record {
        entry: String,
        counted: bool,
        result: DumpResult<()>,
    },
    /// A chunk was committed
    Chunk(ChunkInfo),
    /// A chunk was dropped after a failed write, losing its earlier entries
    Abandoned(AbandonedChunk),
    /// The dump cannot continue
    Fatal(DumpError),
    /// A worker drained the queue and exited
    WorkerDone { worker: usize },
}

/// Drain the queue into chunks until it is closed
pub fn run_worker(
    worker: usize,
    mut packer: ChunkPacker,
    queue: Receiver<ArchiveRecord>,
    reports: Sender<Report>,
) {
    for record in queue.iter() {
        let counted = record.is_counted();
        match packer.write(&record) {
            Err(e) if e.is_fatal() => {
                let _ = reports.send(Report::Fatal(e));
                return;
            }
            result => {
                let report = Report::Record {
                    entry: record.entry_name().to_string(),
                    counted,
                    result,
                };
                if reports.send(report).is_err() {
                    return;
                }
                if let Some(lost) = packer.take_abandoned() {
                    if reports.send(Report::Abandoned(lost)).is_err() {
                        return;
                    }
                }
            }
        }

        if packer.is_full() && !commit(&mut packer, &reports) {
            return;
        }
    }

    if !commit(&mut packer, &reports) {
        return;
    }
    debug!(event = %Event::WorkerFinished, worker);
    let _ = reports.send(Report::WorkerDone { worker });
}

/// Finalize the open chunk; false when the worker must stop
fn commit(packer: &mut ChunkPacker, reports: &Sender<Report>) -> bool {
    let report = match packer.finish() {
        Ok(None) => return true,
        Ok(Some(info)) => Report::Chunk(info),
        Err(e) => {
            let _ = reports.send(Report::Fatal(e));
            return false;
        }
    };
    reports.send(report).is_ok()
}

/// Stream every selected collection into the queue
///
/// Returns the largest queue length seen right after a send.
pub fn run_producer(
    source: &dyn DocumentSource,
    only: Option<&str>,
    queue: Sender<ArchiveRecord>,
    count: Sender<()>,
    reports: Sender<Report>,
) -> usize {
    let collections = match only {
        Some(name) => vec![name.to_string()],
        None => match source.collections() {
            Ok(names) => names,
            Err(e) => {
                let _ = reports.send(Report::Fatal(DumpError::source("Could not list collections", e)));
                return 0;
            }
        },
    };

    let mut max_queued = 0;
    for collection in collections.iter().filter(|c| !is_system_collection(c)) {
        if let Some(record) = index_record(source, collection) {
            if queue.send(record).is_err() {
                return max_queued;
            }
            max_queued = max_queued.max(queue.len());
        }

        let documents = match source.documents(collection) {
            Ok(documents) => documents,
            Err(e) => {
                warn!(event = %Event::SourceError, collection = %collection, error = %e);
                continue;
            }
        };

        for result in documents {
            match result {
                Ok(record) => {
                    if queue.send(ArchiveRecord::Document(record)).is_err() {
                        return max_queued;
                    }
                    max_queued = max_queued.max(queue.len());
                    if count.send(()).is_err() {
                        return max_queued;
                    }
                }
                Err(e) if e.is_document_level() => {
                    warn!(event = %Event::SourceError, collection = %collection, error = %e);
                }
                Err(e) => {
                    warn!(event = %Event::SourceError, collection = %collection, error = %e);
                    break;
                }
            }
        }
    }
    max_queued
}

/// The `indexes.json` record of a collection, if it declares any index
fn index_record(source: &dyn DocumentSource, collection: &str) -> Option<ArchiveRecord> {
    let specs = match source.indexes(collection) {
        Ok(specs) => specs,
        Err(e) => {
            warn!(event = %Event::SourceError, collection = %collection, error = %e);
            return None;
        }
    };
    if specs.is_empty() {
        return None;
    }
    match IndexSpec::encode_list(&specs) {
        Ok(payload) => Some(ArchiveRecord::Indexes {
            database: source.name().to_string(),
            collection: collection.to_string(),
            payload: Bytes::from(payload),
        }),
        Err(e) => {
            warn!(event = %Event::SourceError, collection = %collection, error = %e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::document::bson::DocumentBuilder;
    use crate::document::ObjectId;
    use crate::file_storage::{LocalBackend, StdioBackend};
    use crossbeam_channel::{bounded, unbounded};
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn doc(n: u8) -> Vec<u8> {
        DocumentBuilder::new()
            .object_id("_id", ObjectId::from_bytes([n; 12]))
            .build()
    }

    fn produce_all(db: &MemoryDatabase, only: Option<&str>) -> (Vec<ArchiveRecord>, usize, usize) {
        let (queue_tx, queue_rx) = unbounded();
        let (count_tx, count_rx) = unbounded();
        let (report_tx, _report_rx) = unbounded();
        let max = run_producer(db, only, queue_tx, count_tx, report_tx);
        (queue_rx.iter().collect(), count_rx.iter().count(), max)
    }

    #[test]
    fn test_producer_skips_system_and_counts_documents() {
        let db = MemoryDatabase::new("test");
        db.seed("people", doc(1));
        db.seed("people", doc(2));
        db.seed_index("people", IndexSpec::new(json!({"name": "a_1"})));
        db.seed("system.indexes", doc(3));
        db.create_collection("empty");

        let (records, counted, _) = produce_all(&db, None);
        assert_eq!(counted, 2);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].entry_name().to_string(), "test/people/indexes.json");
        assert!(records.iter().all(|r| r.entry_name().collection() != "system.indexes"));
    }

    #[test]
    fn test_producer_single_collection() {
        let db = MemoryDatabase::new("test");
        db.seed("a", doc(1));
        db.seed("b", doc(2));

        let (records, counted, _) = produce_all(&db, Some("b"));
        assert_eq!(counted, 1);
        assert_eq!(records[0].entry_name().collection(), "b");
    }

    #[test]
    fn test_producer_survives_bad_documents() {
        let db = MemoryDatabase::new("test");
        db.seed("people", DocumentBuilder::new().string("_id", "x").build());
        db.seed("people", doc(2));
        db.fail_cursor_on("people");

        let (records, counted, _) = produce_all(&db, None);
        assert_eq!(counted, 1);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_worker_reports_records_then_done() {
        let temp = TempDir::new().unwrap();
        let packer = ChunkPacker::new(Arc::new(LocalBackend::new(temp.path())), "", u64::MAX);
        let (queue_tx, queue_rx) = bounded(0);
        let (report_tx, report_rx) = unbounded();

        let handle = thread::spawn(move || run_worker(7, packer, queue_rx, report_tx));
        let db = MemoryDatabase::new("test");
        db.seed("people", doc(1));
        for record in db.documents("people").unwrap() {
            queue_tx.send(ArchiveRecord::Document(record.unwrap())).unwrap();
        }
        drop(queue_tx);
        handle.join().unwrap();

        let reports: Vec<_> = report_rx.iter().collect();
        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[0], Report::Record { counted: true, result: Ok(()), .. }));
        assert!(matches!(reports[1], Report::Chunk(ref info) if info.entries == 1));
        assert!(matches!(reports[2], Report::WorkerDone { worker: 7 }));
    }

    #[test]
    fn test_worker_stops_on_fatal() {
        let packer = ChunkPacker::new(Arc::new(StdioBackend), "", 10);
        let (queue_tx, queue_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        let db = MemoryDatabase::new("test");
        db.seed("people", doc(1));
        db.seed("people", doc(2));
        for record in db.documents("people").unwrap() {
            queue_tx.send(ArchiveRecord::Document(record.unwrap())).unwrap();
        }
        drop(queue_tx);
        run_worker(0, packer, queue_rx, report_tx);

        let reports: Vec<_> = report_rx.iter().collect();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0], Report::Fatal(ref e) if e.is_fatal()));
    }
}
