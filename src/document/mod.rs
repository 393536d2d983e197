//! Document model shared by dump and restore
//!
//! A document travels as its exact serialized bytes plus the identifier
//! extracted from them once. Bytes are never re-encoded.

pub mod bson;
mod entry;
mod errors;
mod index;

pub use entry::{EntryName, INDEXES_FILE};
pub use errors::DocumentError;
pub use index::IndexSpec;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

/// 12-byte document identifier, rendered as 24 lowercase hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Length of the hex form
    pub const HEX_LEN: usize = 24;

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse exactly 24 hex digits
    pub fn parse(s: &str) -> Result<Self, DocumentError> {
        if s.len() != Self::HEX_LEN {
            return Err(DocumentError::InvalidObjectId(s.to_string()));
        }
        let mut out = [0u8; 12];
        hex::decode_to_slice(s, &mut out).map_err(|_| DocumentError::InvalidObjectId(s.to_string()))?;
        Ok(Self(out))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One streamed document with the context it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Exact serialized bytes as captured
    pub raw: Bytes,
    pub id: ObjectId,
    pub collection: String,
    pub database: String,
}

impl DocumentRecord {
    /// Capture a document, extracting its `_id` without touching `raw`
    pub fn from_raw(
        database: impl Into<String>,
        collection: impl Into<String>,
        raw: Bytes,
    ) -> Result<Self, DocumentError> {
        let id = bson::extract_object_id(&raw)?.ok_or(DocumentError::MissingIdentifier)?;
        Ok(Self {
            raw,
            id,
            collection: collection.into(),
            database: database.into(),
        })
    }

    /// Archive entry name `<db>/<collection>/<id>`
    pub fn entry_name(&self) -> EntryName {
        EntryName::Document {
            database: self.database.clone(),
            collection: self.collection.clone(),
            id: self.id,
        }
    }
}
