//! Dump control loop
//!
//! One loop multiplexes the count and report channels. The dump is done
//! when the count channel is closed, no counted record is still pending
//! and every worker has exited, all evaluated together.

use crossbeam_channel::{never, select, Receiver};
use tracing::{debug, info, warn};

use super::errors::{DumpError, DumpResult};
use super::pool::Report;
use crate::observability::{Event, Progress};

/// Totals gathered while coordinating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub documents: u64,
    pub failed: u64,
    pub chunks: u64,
}

/// Run the loop until completion or the first fatal report
pub fn coordinate(
    count: Receiver<()>,
    reports: Receiver<Report>,
    workers: usize,
    progress: &Progress,
) -> DumpResult<Tally> {
    let closed_count = never();
    let closed_reports = never();
    let mut count_open = true;
    let mut reports_open = true;

    let mut tally = Tally::default();
    let mut pending: i64 = 0;
    let mut running = workers;

    loop {
        let count_rx = if count_open { &count } else { &closed_count };
        let report_rx = if reports_open { &reports } else { &closed_reports };

        select! {
            recv(count_rx) -> msg => match msg {
                Ok(()) => {
                    tally.documents += 1;
                    pending += 1;
                    progress.set(tally.documents);
                }
                Err(_) => count_open = false,
            },
            recv(report_rx) -> msg => match msg {
                Ok(Report::Record { entry, counted, result }) => {
                    if counted {
                        pending -= 1;
                    }
                    if let Err(e) = result {
                        tally.failed += 1;
                        warn!(event = %Event::RecordFailed, entry = %entry, error = %e);
                    }
                }
                Ok(Report::Chunk(chunk)) => {
                    tally.chunks += 1;
                    info!(
                        event = %Event::ChunkCommitted,
                        path = %chunk.path,
                        entries = chunk.entries,
                        bytes = chunk.bytes
                    );
                }
                Ok(Report::Abandoned(lost)) => {
                    tally.failed += lost.entries.len() as u64;
                    warn!(
                        event = %Event::ChunkAbandoned,
                        path = %lost.path,
                        lost = lost.entries.len()
                    );
                }
                Ok(Report::Fatal(e)) => return Err(e),
                Ok(Report::WorkerDone { worker }) => {
                    running = running.saturating_sub(1);
                    debug!(worker, running, "worker done");
                }
                Err(_) => {
                    if running > 0 {
                        return Err(DumpError::failed(format!(
                            "{} worker(s) exited without finishing",
                            running
                        )));
                    }
                    reports_open = false;
                }
            },
        }

        if !count_open && pending == 0 && running == 0 {
            return Ok(tally);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::packer::{AbandonedChunk, ChunkInfo};
    use crossbeam_channel::unbounded;
    use std::io;

    fn record(counted: bool, ok: bool) -> Report {
        Report::Record {
            entry: "test/people/000000000000000000000000".into(),
            counted,
            result: if ok {
                Ok(())
            } else {
                Err(DumpError::record_write("x", io::Error::new(io::ErrorKind::Other, "boom")))
            },
        }
    }

    #[test]
    fn test_completes_when_all_signals_settle() {
        let (count_tx, count_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        count_tx.send(()).unwrap();
        count_tx.send(()).unwrap();
        drop(count_tx);
        report_tx.send(record(false, true)).unwrap();
        report_tx.send(record(true, true)).unwrap();
        report_tx.send(record(true, false)).unwrap();
        report_tx
            .send(Report::Chunk(ChunkInfo {
                path: "dump/dump.x".into(),
                entries: 3,
                bytes: 10,
            }))
            .unwrap();
        report_tx.send(Report::WorkerDone { worker: 0 }).unwrap();

        let tally = coordinate(count_rx, report_rx, 1, &Progress::hidden()).unwrap();
        assert_eq!(
            tally,
            Tally {
                documents: 2,
                failed: 1,
                chunks: 1
            }
        );
    }

    #[test]
    fn test_abandoned_entries_count_as_failed() {
        let (count_tx, count_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        for _ in 0..3 {
            count_tx.send(()).unwrap();
        }
        drop(count_tx);
        report_tx.send(record(true, true)).unwrap();
        report_tx.send(record(true, true)).unwrap();
        report_tx.send(record(true, false)).unwrap();
        report_tx
            .send(Report::Abandoned(AbandonedChunk {
                path: "dump/dump.x".into(),
                entries: vec!["a".into(), "b".into()],
            }))
            .unwrap();
        report_tx.send(Report::WorkerDone { worker: 0 }).unwrap();

        let tally = coordinate(count_rx, report_rx, 1, &Progress::hidden()).unwrap();
        assert_eq!(tally.documents, 3);
        assert_eq!(tally.failed, 3);
        assert_eq!(tally.chunks, 0);
    }

    #[test]
    fn test_fatal_returns_immediately() {
        let (_count_tx, count_rx) = unbounded::<()>();
        let (report_tx, report_rx) = unbounded();
        report_tx
            .send(Report::Fatal(DumpError::failed("sink gone")))
            .unwrap();

        let err = coordinate(count_rx, report_rx, 2, &Progress::hidden()).unwrap_err();
        assert!(err.message().contains("sink gone"));
    }

    #[test]
    fn test_lost_worker_is_an_error() {
        let (count_tx, count_rx) = unbounded::<()>();
        let (report_tx, report_rx) = unbounded::<Report>();
        drop(count_tx);
        drop(report_tx);

        assert!(coordinate(count_rx, report_rx, 1, &Progress::hidden()).is_err());
    }

    #[test]
    fn test_no_workers_and_no_input() {
        let (count_tx, count_rx) = unbounded::<()>();
        let (_report_tx, report_rx) = unbounded::<Report>();
        drop(count_tx);

        assert_eq!(
            coordinate(count_rx, report_rx, 0, &Progress::hidden()).unwrap(),
            Tally::default()
        );
    }
}
