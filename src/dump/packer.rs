//! Size-bounded chunk packing
//!
//! Each record is staged as a complete tar entry (header, payload and
//! padding) and handed to the storage sink in one write. A chunk opens on
//! the first record after a budget reset and is finalized once the
//! payload bytes written reach the chunk size. An entry is never split;
//! the budget is checked only after it is written.
//!
//! A sink that fails mid-entry leaves the chunk unreadable past that
//! point, so the whole chunk is abandoned uncommitted and the next record
//! starts a fresh one.

use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use tar::{Builder, EntryType, Header};
use tracing::debug;
use uuid::Uuid;

use super::errors::{DumpError, DumpResult};
use crate::document::{DocumentRecord, EntryName};
use crate::file_storage::{join_path, ObjectSink, StorageBackend};
use crate::observability::Event;

/// Prefix of every chunk object name
pub const CHUNK_PREFIX: &str = "dump.";

const ENTRY_MODE: u32 = 0o644;

/// One unit of work for a packer
#[derive(Debug, Clone)]
pub enum ArchiveRecord {
    Document(DocumentRecord),
    /// Serialized index list of one collection
    Indexes {
        database: String,
        collection: String,
        payload: Bytes,
    },
}

impl ArchiveRecord {
    pub fn entry_name(&self) -> EntryName {
        match self {
            ArchiveRecord::Document(record) => record.entry_name(),
            ArchiveRecord::Indexes {
                database,
                collection,
                ..
            } => EntryName::Indexes {
                database: database.clone(),
                collection: collection.clone(),
            },
        }
    }

    pub fn payload(&self) -> &Bytes {
        match self {
            ArchiveRecord::Document(record) => &record.raw,
            ArchiveRecord::Indexes { payload, .. } => payload,
        }
    }

    /// Whether the record counts as a processed document
    pub fn is_counted(&self) -> bool {
        matches!(self, ArchiveRecord::Document(_))
    }
}

/// A finalized, committed chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub path: String,
    pub entries: usize,
    /// Payload bytes, excluding tar headers and padding
    pub bytes: u64,
}

/// A chunk dropped after a failed write; none of its entries were stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonedChunk {
    pub path: String,
    /// Entries written before the failure
    pub entries: Vec<String>,
}

struct OpenChunk {
    path: String,
    sink: Box<dyn ObjectSink>,
    names: Vec<String>,
    bytes: u64,
}

/// End-of-archive marker: two zero blocks
const TRAILER: [u8; 1024] = [0; 1024];

/// Packs records into chunks under one root
pub struct ChunkPacker {
    backend: Arc<dyn StorageBackend>,
    root: String,
    chunk_size: i64,
    remaining: i64,
    open: Option<OpenChunk>,
    abandoned: Option<AbandonedChunk>,
}

impl ChunkPacker {
    /// `chunk_size` is the payload byte budget per chunk
    pub fn new(backend: Arc<dyn StorageBackend>, root: impl Into<String>, chunk_size: u64) -> Self {
        let chunk_size = i64::try_from(chunk_size).unwrap_or(i64::MAX);
        Self {
            backend,
            root: root.into(),
            chunk_size,
            remaining: chunk_size,
            open: None,
            abandoned: None,
        }
    }

    /// Append one record, opening a chunk first if none is open
    ///
    /// Failing to open the chunk is fatal. Failing to encode the entry
    /// loses only this record. Failing to write it to the sink loses the
    /// open chunk as well; see [`ChunkPacker::take_abandoned`].
    pub fn write(&mut self, record: &ArchiveRecord) -> DumpResult<()> {
        let name = record.entry_name().to_string();
        let payload = record.payload();
        let staged = stage_entry(&name, payload).map_err(|e| DumpError::record_write(&name, e))?;

        let chunk = match self.open.take() {
            Some(chunk) => self.open.insert(chunk),
            None => {
                let chunk = self.open_chunk()?;
                self.open.insert(chunk)
            }
        };

        if let Err(e) = chunk.sink.write_all(&staged) {
            self.abandon();
            return Err(DumpError::record_write(&name, e));
        }

        chunk.names.push(name);
        chunk.bytes += payload.len() as u64;
        self.remaining = self.remaining.saturating_sub(payload.len() as i64);
        Ok(())
    }

    /// The chunk dropped by the last failed write, if any
    pub fn take_abandoned(&mut self) -> Option<AbandonedChunk> {
        self.abandoned.take()
    }

    /// Whether the open chunk has used up its budget
    pub fn is_full(&self) -> bool {
        self.open.is_some() && self.remaining <= 0
    }

    /// Whether a chunk is currently open
    pub fn has_open_chunk(&self) -> bool {
        self.open.is_some()
    }

    /// Write the end-of-archive marker and commit the open chunk
    ///
    /// Returns `None` when no chunk is open. The budget is reset either way.
    pub fn finish(&mut self) -> DumpResult<Option<ChunkInfo>> {
        self.remaining = self.chunk_size;
        let Some(chunk) = self.open.take() else {
            return Ok(None);
        };

        let OpenChunk {
            path,
            mut sink,
            names,
            bytes,
        } = chunk;
        sink.write_all(&TRAILER)
            .map_err(|e| DumpError::sink_commit(&path, e))?;
        sink.commit().map_err(|e| DumpError::sink_commit(&path, e))?;

        Ok(Some(ChunkInfo {
            path,
            entries: names.len(),
            bytes,
        }))
    }

    /// Drop the open chunk without committing it
    fn abandon(&mut self) {
        self.remaining = self.chunk_size;
        if let Some(chunk) = self.open.take() {
            self.abandoned = Some(AbandonedChunk {
                path: chunk.path,
                entries: chunk.names,
            });
        }
    }

    fn open_chunk(&self) -> DumpResult<OpenChunk> {
        let path = join_path(&self.root, &chunk_name());
        let sink = self
            .backend
            .save(&path)
            .map_err(|e| DumpError::sink_open(&path, e))?;
        debug!(event = %Event::ChunkOpened, path = %path);

        Ok(OpenChunk {
            path,
            sink,
            names: Vec::new(),
            bytes: 0,
        })
    }
}

/// Fresh collision-resistant chunk name
pub fn chunk_name() -> String {
    format!("{}{}", CHUNK_PREFIX, Uuid::new_v4().simple())
}

/// One complete tar entry, ready for a single sink write
fn stage_entry(name: &str, payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut header = entry_header(payload.len() as u64);
    let mut staging = Builder::new(Vec::with_capacity(payload.len() + 1024));
    staging.append_data(&mut header, name, payload)?;
    Ok(std::mem::take(staging.get_mut()))
}

fn entry_header(size: u64) -> Header {
    let (uid, gid) = owner();
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(size);
    header.set_mode(ENTRY_MODE);
    header.set_uid(uid);
    header.set_gid(gid);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
    header
}

#[cfg(unix)]
fn owner() -> (u64, u64) {
    // SAFETY: getuid and getgid cannot fail and touch no memory
    unsafe { (libc::getuid() as u64, libc::getgid() as u64) }
}

#[cfg(not(unix))]
fn owner() -> (u64, u64) {
    (0, 0)
}
