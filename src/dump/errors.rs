//! Dump-specific error types
//!
//! Dump errors follow the coded model:
//! - Structured error codes in DUMP_NAME format
//! - Severity decides whether the dump stops
//!
//! Losing a destination sink is FATAL. A single record that cannot be
//! written is ERROR severity; it is reported and the dump goes on.

use std::error::Error as StdError;
use std::fmt;

use crate::database::DatabaseError;
use crate::file_storage::StorageError;

type Source = Box<dyn StdError + Send + Sync + 'static>;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// One record lost, the dump continues
    Error,
    /// The dump cannot continue
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Dump error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpErrorCode {
    /// Destination chunk could not be opened
    DumpSinkOpen,
    /// Destination chunk could not be finalized or committed
    DumpSinkCommit,
    /// One archive entry could not be written
    DumpRecordWrite,
    /// Source database could not be read
    DumpSource,
    /// Invalid dump configuration
    DumpConfig,
}

impl DumpErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DumpErrorCode::DumpSinkOpen => "DUMP_SINK_OPEN",
            DumpErrorCode::DumpSinkCommit => "DUMP_SINK_COMMIT",
            DumpErrorCode::DumpRecordWrite => "DUMP_RECORD_WRITE",
            DumpErrorCode::DumpSource => "DUMP_SOURCE",
            DumpErrorCode::DumpConfig => "DUMP_CONFIG",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DumpErrorCode::DumpRecordWrite => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for DumpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dump error with full context
#[derive(Debug)]
pub struct DumpError {
    code: DumpErrorCode,
    message: String,
    source: Option<Source>,
}

impl DumpError {
    fn new(code: DumpErrorCode, message: impl Into<String>, source: Option<Source>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// A chunk sink could not be opened at `path`
    pub fn sink_open(path: &str, source: StorageError) -> Self {
        Self::new(
            DumpErrorCode::DumpSinkOpen,
            format!("Could not open writer for {}", path),
            Some(Box::new(source)),
        )
    }

    /// A chunk could not be finalized or committed at `path`
    pub fn sink_commit(path: &str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::new(
            DumpErrorCode::DumpSinkCommit,
            format!("Could not commit {}", path),
            Some(Box::new(source)),
        )
    }

    /// The entry named `entry` could not be written
    pub fn record_write(entry: &str, source: std::io::Error) -> Self {
        Self::new(
            DumpErrorCode::DumpRecordWrite,
            format!("Error saving object {}", entry),
            Some(Box::new(source)),
        )
    }

    /// The source database failed
    pub fn source(message: impl Into<String>, source: DatabaseError) -> Self {
        Self::new(DumpErrorCode::DumpSource, message, Some(Box::new(source)))
    }

    /// Internal failure of the dump machinery itself
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::DumpSource, message, None)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(DumpErrorCode::DumpConfig, message, None)
    }

    pub fn code(&self) -> DumpErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Whether the dump must stop
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl StdError for DumpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for dump operations
pub type DumpResult<T> = Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_codes() {
        assert_eq!(DumpErrorCode::DumpSinkOpen.as_str(), "DUMP_SINK_OPEN");
        assert_eq!(DumpErrorCode::DumpSinkCommit.as_str(), "DUMP_SINK_COMMIT");
        assert_eq!(DumpErrorCode::DumpRecordWrite.as_str(), "DUMP_RECORD_WRITE");
        assert_eq!(DumpErrorCode::DumpSource.as_str(), "DUMP_SOURCE");
        assert_eq!(DumpErrorCode::DumpConfig.as_str(), "DUMP_CONFIG");
    }

    #[test]
    fn test_only_record_errors_are_recoverable() {
        let record = DumpError::record_write("db/c/x", io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(!record.is_fatal());
        assert_eq!(record.severity(), Severity::Error);

        assert!(DumpError::sink_open("dump/dump.1", StorageError::Unsupported("save")).is_fatal());
        assert!(DumpError::sink_commit("dump/dump.1", StorageError::Transport("reset".into())).is_fatal());
        assert!(DumpError::config("concurrency must be at least 1").is_fatal());
    }

    #[test]
    fn test_display_contains_code_and_cause() {
        let err = DumpError::sink_open("dump/dump.1", StorageError::Unsupported("save"));
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("DUMP_SINK_OPEN"));
        assert!(display.contains("dump/dump.1"));
        assert!(display.contains("caused by"));
    }
}
