//! Database driver errors

use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentError;

/// Result type for driver operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database location {0}")]
    InvalidDatabase(String),

    #[error("Invalid collection name '{0}'")]
    InvalidCollection(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Document in {collection} skipped: {source}")]
    Document {
        collection: String,
        #[source]
        source: DocumentError,
    },

    #[error("Cursor on {collection} failed: {reason}")]
    Cursor { collection: String, reason: String },

    #[error("Insert into {collection} failed: {reason}")]
    Insert { collection: String, reason: String },

    #[error("Index on {collection} failed: {reason}")]
    Index { collection: String, reason: String },

    #[error("Invalid index file {path}: {source}")]
    IndexFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DatabaseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatabaseError::Io {
            path: path.into(),
            source,
        }
    }

    /// A single document could not be read; the rest of the cursor is usable
    pub fn is_document_level(&self) -> bool {
        matches!(self, DatabaseError::Document { .. })
    }
}
