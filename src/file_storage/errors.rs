//! # Storage Errors

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    // Object errors
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    // Remote store errors
    #[error("Missing {0} environment variable")]
    MissingCredentials(&'static str),

    #[error("Expected 200 OK from {url}, got ({status}): {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Listing of '{0}' is truncated to a single result page")]
    ListingTruncated(String),

    #[error("Malformed listing response: {0}")]
    MalformedListing(String),

    #[error("{0} is not supported by this storage")]
    Unsupported(&'static str),

    #[error("Walk aborted: {0}")]
    WalkAborted(String),

    // I/O errors
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// I/O error tagged with the logical path it happened at
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the object simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::ObjectNotFound(_))
    }
}

impl From<StorageError> for std::io::Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Io { source, .. } => source,
            StorageError::ObjectNotFound(p) => {
                std::io::Error::new(std::io::ErrorKind::NotFound, p)
            }
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}
