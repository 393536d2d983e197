//! Chunk entry extraction
//!
//! Reads the tar entries of one chunk in order and classifies each by
//! name. Reading stops at the end-of-archive marker or a clean end of
//! stream.

use std::io::Read;

use bytes::Bytes;
use tar::Archive;

use super::errors::{RestoreError, RestoreResult};
use crate::document::bson::MAX_DOCUMENT_SIZE;
use crate::document::{EntryName, ObjectId};

/// One classified entry of a chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkEntry {
    Document {
        collection: String,
        id: ObjectId,
        raw: Bytes,
    },
    /// Undecoded `indexes.json` payload
    Indexes { collection: String, payload: Bytes },
}

/// Visit every entry of a chunk stream
///
/// The first error, from the stream or from `visit`, stops the read.
pub fn read_entries<R, F>(chunk: &str, reader: R, mut visit: F) -> RestoreResult<usize>
where
    R: Read,
    F: FnMut(ChunkEntry) -> RestoreResult<()>,
{
    let mut archive = Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| RestoreError::io_error(format!("Could not read {}", chunk), e))?;

    let mut count = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| RestoreError::io_error(format!("Could not read {}", chunk), e))?;
        let name = entry
            .path()
            .map_err(|e| RestoreError::io_error(format!("Bad entry path in {}", chunk), e))?
            .to_string_lossy()
            .into_owned();
        let parsed = EntryName::parse(&name).map_err(|e| RestoreError::invalid_entry(&name, e))?;

        let mut payload = Vec::with_capacity(entry.size().min(MAX_DOCUMENT_SIZE as u64) as usize);
        entry
            .read_to_end(&mut payload)
            .map_err(|e| RestoreError::io_error(format!("Could not read {} in {}", name, chunk), e))?;
        let payload = Bytes::from(payload);

        let classified = match parsed {
            EntryName::Document { collection, id, .. } => ChunkEntry::Document {
                collection,
                id,
                raw: payload,
            },
            EntryName::Indexes { collection, .. } => ChunkEntry::Indexes { collection, payload },
        };
        visit(classified)?;
        count += 1;
    }
    Ok(count)
}
