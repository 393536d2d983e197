//! Archive entry names
//!
//! ```text
//! <database>/<collection>/<24 hex id>
//! <database>/<collection>/indexes.json
//! ```

use std::fmt;

use super::{DocumentError, ObjectId};

/// File name of the per-collection index entry
pub const INDEXES_FILE: &str = "indexes.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryName {
    Document {
        database: String,
        collection: String,
        id: ObjectId,
    },
    Indexes {
        database: String,
        collection: String,
    },
}

impl EntryName {
    /// Parse an entry name; exactly three non-empty parts are required
    pub fn parse(name: &str) -> Result<Self, DocumentError> {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(DocumentError::InvalidEntryName(name.to_string()));
        }
        let (database, collection, leaf) = (parts[0].to_string(), parts[1].to_string(), parts[2]);

        if leaf == INDEXES_FILE {
            return Ok(EntryName::Indexes { database, collection });
        }
        Ok(EntryName::Document {
            database,
            collection,
            id: ObjectId::parse(leaf)?,
        })
    }

    pub fn database(&self) -> &str {
        match self {
            EntryName::Document { database, .. } | EntryName::Indexes { database, .. } => database,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            EntryName::Document { collection, .. } | EntryName::Indexes { collection, .. } => collection,
        }
    }

    pub fn is_indexes(&self) -> bool {
        matches!(self, EntryName::Indexes { .. })
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryName::Document {
                database,
                collection,
                id,
            } => write!(f, "{}/{}/{}", database, collection, id),
            EntryName::Indexes { database, collection } => {
                write!(f, "{}/{}/{}", database, collection, INDEXES_FILE)
            }
        }
    }
}
