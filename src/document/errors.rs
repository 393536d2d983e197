//! Document and archive-entry errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("Document has no ObjectId _id")]
    MissingIdentifier,

    #[error("Invalid entry name '{0}': expected <db>/<collection>/<id|indexes.json>")]
    InvalidEntryName(String),

    #[error("Invalid document length {0}")]
    InvalidLength(u32),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Unexpected end of stream inside a document")]
    UnexpectedEof,

    #[error("Invalid index list: {0}")]
    InvalidIndexes(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
