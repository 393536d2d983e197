//! Restore-specific error types
//!
//! Restore errors follow the coded model:
//! - Structured error codes in RESTORE_NAME format
//! - No silent failures
//!
//! All restore errors are FATAL. Documents inserted before the failure
//! stay in the destination.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::database::DatabaseError;
use crate::document::DocumentError;
use crate::file_storage::StorageError;

type Source = Box<dyn StdError + Send + Sync + 'static>;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The restore stops
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Restore error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreErrorCode {
    /// General restore failure
    RestoreFailed,
    /// Archive could not be listed or read
    RestoreIo,
    /// Entry name or payload is not a valid archive entry
    RestoreInvalidEntry,
    /// Second index entry for one collection
    RestoreDuplicateIndex,
    /// Destination rejected a document
    RestoreInsert,
    /// Destination rejected an index
    RestoreIndex,
}

impl RestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreErrorCode::RestoreFailed => "RESTORE_FAILED",
            RestoreErrorCode::RestoreIo => "RESTORE_IO",
            RestoreErrorCode::RestoreInvalidEntry => "RESTORE_INVALID_ENTRY",
            RestoreErrorCode::RestoreDuplicateIndex => "RESTORE_DUPLICATE_INDEX",
            RestoreErrorCode::RestoreInsert => "RESTORE_INSERT",
            RestoreErrorCode::RestoreIndex => "RESTORE_INDEX",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for RestoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Restore error with full context
#[derive(Debug)]
pub struct RestoreError {
    code: RestoreErrorCode,
    message: String,
    source: Option<Source>,
}

impl RestoreError {
    fn new(code: RestoreErrorCode, message: impl Into<String>, source: Option<Source>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::RestoreFailed, message, None)
    }

    /// Reading or listing the archive failed
    pub fn storage(message: impl Into<String>, source: StorageError) -> Self {
        Self::new(RestoreErrorCode::RestoreIo, message, Some(Box::new(source)))
    }

    /// Reading a chunk stream failed
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(RestoreErrorCode::RestoreIo, message, Some(Box::new(source)))
    }

    /// The entry `name` cannot be restored
    pub fn invalid_entry(name: &str, source: DocumentError) -> Self {
        Self::new(
            RestoreErrorCode::RestoreInvalidEntry,
            format!("Invalid archive entry {}", name),
            Some(Box::new(source)),
        )
    }

    pub fn duplicate_index(collection: &str) -> Self {
        Self::new(
            RestoreErrorCode::RestoreDuplicateIndex,
            format!("Indexes already stored for {}", collection),
            None,
        )
    }

    pub fn insert(collection: &str, source: DatabaseError) -> Self {
        Self::new(
            RestoreErrorCode::RestoreInsert,
            format!("Could not insert into {}", collection),
            Some(Box::new(source)),
        )
    }

    pub fn index(collection: &str, source: DatabaseError) -> Self {
        Self::new(
            RestoreErrorCode::RestoreIndex,
            format!("Could not apply indexes for {}", collection),
            Some(Box::new(source)),
        )
    }

    pub fn code(&self) -> RestoreErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Restore errors are always fatal
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl StdError for RestoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for restore operations
pub type RestoreResult<T> = Result<T, RestoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RestoreErrorCode::RestoreFailed.as_str(), "RESTORE_FAILED");
        assert_eq!(RestoreErrorCode::RestoreIo.as_str(), "RESTORE_IO");
        assert_eq!(RestoreErrorCode::RestoreInvalidEntry.as_str(), "RESTORE_INVALID_ENTRY");
        assert_eq!(RestoreErrorCode::RestoreDuplicateIndex.as_str(), "RESTORE_DUPLICATE_INDEX");
        assert_eq!(RestoreErrorCode::RestoreInsert.as_str(), "RESTORE_INSERT");
        assert_eq!(RestoreErrorCode::RestoreIndex.as_str(), "RESTORE_INDEX");
    }

    #[test]
    fn test_all_errors_are_fatal_severity() {
        let codes = [
            RestoreErrorCode::RestoreFailed,
            RestoreErrorCode::RestoreIo,
            RestoreErrorCode::RestoreInvalidEntry,
            RestoreErrorCode::RestoreDuplicateIndex,
            RestoreErrorCode::RestoreInsert,
            RestoreErrorCode::RestoreIndex,
        ];

        for code in codes {
            assert_eq!(code.severity(), Severity::Fatal);
        }
    }

    #[test]
    fn test_error_display_contains_required_fields() {
        let err = RestoreError::duplicate_index("people");
        let display = format!("{}", err);

        assert!(display.contains("FATAL"));
        assert!(display.contains("RESTORE_DUPLICATE_INDEX"));
        assert!(display.contains("people"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_with_source() {
        let err = RestoreError::invalid_entry("a/b", DocumentError::InvalidEntryName("a/b".into()));
        let display = format!("{}", err);
        assert!(display.contains("caused by"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn test_storage_error_is_io_code() {
        let err = RestoreError::storage("listing failed", StorageError::ListingTruncated("dump/".into()));
        assert_eq!(err.code(), RestoreErrorCode::RestoreIo);
    }
}
