//! CLI-specific error types
//!
//! All CLI errors are FATAL: `main` prints the error and exits 1.

use std::fmt;
use std::io;

use crate::database::DatabaseError;
use crate::dump::DumpError;
use crate::file_storage::StorageError;
use crate::restore::RestoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Database could not be opened
    DatabaseError,
    /// Target or source could not be used
    StorageError,
    /// Dump stopped
    DumpFailed,
    /// Restore stopped
    RestoreFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CLI_CONFIG_ERROR",
            Self::IoError => "CLI_IO_ERROR",
            Self::DatabaseError => "CLI_DATABASE_ERROR",
            Self::StorageError => "CLI_STORAGE_ERROR",
            Self::DumpFailed => "CLI_DUMP_FAILED",
            Self::RestoreFailed => "CLI_RESTORE_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<DatabaseError> for CliError {
    fn from(e: DatabaseError) -> Self {
        Self::new(CliErrorCode::DatabaseError, e.to_string())
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::new(CliErrorCode::StorageError, e.to_string())
    }
}

impl From<DumpError> for CliError {
    fn from(e: DumpError) -> Self {
        Self::new(CliErrorCode::DumpFailed, e.to_string())
    }
}

impl From<RestoreError> for CliError {
    fn from(e: RestoreError) -> Self {
        Self::new(CliErrorCode::RestoreFailed, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_line_with_code() {
        let err = CliError::from(StorageError::MissingCredentials("AWS_ACCESS_KEY_ID"));
        let line = err.to_string();
        assert!(line.starts_with("CLI_STORAGE_ERROR: "));
        assert!(line.contains("AWS_ACCESS_KEY_ID"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_wrapped_dump_error_keeps_inner_code() {
        let err = CliError::from(DumpError::config("concurrency must be at least 1"));
        assert_eq!(err.code(), &CliErrorCode::DumpFailed);
        assert!(err.message().contains("DUMP_CONFIG"));
    }
}
