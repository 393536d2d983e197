//! # Storage Backend Trait
//!
//! Every archive destination exposes the same three capabilities:
//! save (open a sink, commit when done), fetch (open a source) and
//! walk (enumerate objects under a root).

use std::fmt;
use std::io::{Read, Write};

use super::errors::{StorageError, StorageResult};

/// A write destination returned by [`StorageBackend::save`].
///
/// Bytes written are not guaranteed to be visible until `commit` returns.
/// Dropping a sink without committing abandons the object.
pub trait ObjectSink: Write + Send {
    /// Make the written bytes durable at the sink's location
    fn commit(self: Box<Self>) -> StorageResult<()>;
}

/// A read source returned by [`StorageBackend::fetch`]
pub type ObjectSource = Box<dyn Read + Send>;

/// Callback invoked once per object found by [`StorageBackend::walk`].
///
/// Receives the object's path (usable with `fetch`) and any error the
/// backend hit while producing it. Returning an error aborts the walk.
pub type WalkFn<'a> = dyn FnMut(&str, Option<StorageError>) -> StorageResult<()> + 'a;

/// Backend trait for archive storage
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Open a sink for the object at path
    fn save(&self, path: &str) -> StorageResult<Box<dyn ObjectSink>>;

    /// Open a read stream for the object at path
    fn fetch(&self, path: &str) -> StorageResult<ObjectSource>;

    /// Visit every object under root
    fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> StorageResult<()>;
}

/// Join a logical root and a relative name with exactly one separator
pub fn join_path(root: &str, name: &str) -> String {
    let root = root.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if root.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, name)
    }
}
