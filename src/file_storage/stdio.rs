//! # Standard Stream Backend
//!
//! Placeholder for the `-` target. Streaming a chunked archive through
//! stdin/stdout is not implemented: `select_backend` refuses `-` outright
//! and every operation here fails loudly.

use super::backend::{ObjectSink, ObjectSource, StorageBackend, WalkFn};
use super::errors::{StorageError, StorageResult};

/// Standard-stream backend
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioBackend;

impl StorageBackend for StdioBackend {
    fn save(&self, _path: &str) -> StorageResult<Box<dyn ObjectSink>> {
        Err(StorageError::Unsupported("Saving to standard output"))
    }

    fn fetch(&self, _path: &str) -> StorageResult<ObjectSource> {
        Err(StorageError::Unsupported("Fetching from standard input"))
    }

    fn walk(&self, _root: &str, _visit: &mut WalkFn<'_>) -> StorageResult<()> {
        Err(StorageError::Unsupported("Walking standard input"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operation_fails() {
        let backend = StdioBackend;
        assert!(matches!(backend.save("x"), Err(StorageError::Unsupported(_))));
        assert!(matches!(backend.fetch("x"), Err(StorageError::Unsupported(_))));
        assert!(matches!(
            backend.walk("", &mut |_, _| Ok(())),
            Err(StorageError::Unsupported(_))
        ));
    }
}
