//! # Archive Storage
//!
//! Pluggable destinations for dump chunks: local filesystem, S3-style
//! remote bucket, a gzip decorator over either, and a standard-stream
//! placeholder.

pub mod backend;
pub mod compress;
pub mod errors;
pub mod local;
pub mod remote;
pub mod signer;
pub mod stdio;
pub mod transport;

pub use backend::{join_path, ObjectSink, ObjectSource, StorageBackend, WalkFn};
pub use compress::GzipBackend;
pub use errors::{StorageError, StorageResult};
pub use local::LocalBackend;
pub use remote::RemoteBackend;
pub use signer::{Credentials, RequestSigner, SigV4Signer};
pub use stdio::StdioBackend;
pub use transport::{HttpTransport, MemoryTransport, Method, ObjectRequest, ObjectResponse, ObjectTransport};

use std::sync::Arc;

use reqwest::Url;

/// Where a target string points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// `-`
    Stdio,
    /// `scheme://host/path`: bucket `scheme://host`, key root `/path`
    Remote { bucket: String, root: String },
    /// Anything else, a filesystem directory
    Local { dir: String },
}

impl TargetKind {
    /// Classify a target string
    pub fn parse(target: &str) -> StorageResult<Self> {
        if target == "-" {
            return Ok(TargetKind::Stdio);
        }
        if target.starts_with("http://") || target.starts_with("https://") {
            let url = Url::parse(target)
                .map_err(|e| StorageError::InvalidTarget(format!("{}: {}", target, e)))?;
            let host = url
                .host_str()
                .ok_or_else(|| StorageError::InvalidTarget(format!("{}: missing host", target)))?;
            let bucket = match url.port() {
                Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
                None => format!("{}://{}", url.scheme(), host),
            };
            return Ok(TargetKind::Remote {
                bucket,
                root: url.path().to_string(),
            });
        }
        if target.is_empty() {
            return Err(StorageError::InvalidTarget("empty target".into()));
        }
        Ok(TargetKind::Local {
            dir: target.to_string(),
        })
    }
}

/// Options applied when building a backend from a target string
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageOptions {
    pub compression: bool,
    pub allow_truncated_listing: bool,
}

/// A selected backend plus the logical root inside it
#[derive(Debug, Clone)]
pub struct StorageTarget {
    pub root: String,
    pub backend: Arc<dyn StorageBackend>,
}

/// Build the backend a target string names
///
/// Remote targets require credentials in the environment; their absence
/// is reported here, before any request is made. `-` is refused here too,
/// so a run that would never touch storage still fails.
pub fn select_backend(target: &str, options: StorageOptions) -> StorageResult<StorageTarget> {
    let (root, backend): (String, Arc<dyn StorageBackend>) = match TargetKind::parse(target)? {
        TargetKind::Stdio => return Err(StorageError::Unsupported("Standard stream targets")),
        TargetKind::Remote { bucket, root } => {
            Credentials::from_env()?;
            let transport = HttpTransport::new(Arc::new(SigV4Signer::s3()))?;
            let remote = RemoteBackend::new(&bucket, Arc::new(transport))?
                .allow_truncated_listing(options.allow_truncated_listing);
            (root, Arc::new(remote))
        }
        TargetKind::Local { dir } => (String::new(), Arc::new(LocalBackend::new(dir))),
    };

    Ok(StorageTarget {
        root,
        backend: wrap_compression(backend, options.compression),
    })
}

/// Apply the gzip decorator when requested
pub fn wrap_compression(backend: Arc<dyn StorageBackend>, compression: bool) -> Arc<dyn StorageBackend> {
    if compression {
        Arc::new(GzipBackend::new(backend))
    } else {
        backend
    }
}
