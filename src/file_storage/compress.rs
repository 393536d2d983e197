//! # Gzip Compression Decorator
//!
//! Wraps any backend so that saved objects are gzip-compressed and fetched
//! objects are decompressed. Walking is passed straight through.

use std::io::{self, Write};
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::backend::{ObjectSink, ObjectSource, StorageBackend, WalkFn};
use super::errors::{StorageError, StorageResult};

/// Backend decorator adding a gzip envelope
#[derive(Debug, Clone)]
pub struct GzipBackend {
    inner: Arc<dyn StorageBackend>,
    level: Compression,
}

impl GzipBackend {
    /// Wrap a backend with default compression
    pub fn new(inner: Arc<dyn StorageBackend>) -> Self {
        Self::with_level(inner, Compression::default())
    }

    /// Wrap a backend with an explicit compression level
    pub fn with_level(inner: Arc<dyn StorageBackend>, level: Compression) -> Self {
        Self { inner, level }
    }
}

impl StorageBackend for GzipBackend {
    fn save(&self, path: &str) -> StorageResult<Box<dyn ObjectSink>> {
        let sink = self.inner.save(path)?;
        Ok(Box::new(GzipSink {
            path: path.to_string(),
            encoder: GzEncoder::new(sink, self.level),
        }))
    }

    fn fetch(&self, path: &str) -> StorageResult<ObjectSource> {
        let source = self.inner.fetch(path)?;
        Ok(Box::new(GzDecoder::new(source)))
    }

    fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> StorageResult<()> {
        self.inner.walk(root, visit)
    }
}

/// Compressing sink; the inner sink is committed after the gzip trailer
struct GzipSink {
    path: String,
    encoder: GzEncoder<Box<dyn ObjectSink>>,
}

impl Write for GzipSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl ObjectSink for GzipSink {
    fn commit(self: Box<Self>) -> StorageResult<()> {
        let GzipSink { path, encoder } = *self;
        let inner = encoder.finish().map_err(|e| StorageError::io(path, e))?;
        inner.commit()
    }
}
