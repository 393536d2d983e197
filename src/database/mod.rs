//! # Database Drivers
//!
//! The archive pipeline reads from a [`DocumentSource`] and writes into a
//! [`DocumentTarget`]. Documents cross this boundary as raw bytes; index
//! definitions as opaque [`IndexSpec`]s.

mod errors;
mod local;
mod memory;

pub use errors::{DatabaseError, DatabaseResult};
pub use local::LocalDatabase;
pub use memory::MemoryDatabase;

use bytes::Bytes;

use crate::document::{DocumentRecord, IndexSpec};

/// Prefix of internal collections that are never dumped
pub const SYSTEM_PREFIX: &str = "system.";

/// Lazily streamed documents of one collection
pub type DocumentStream<'a> = Box<dyn Iterator<Item = DatabaseResult<DocumentRecord>> + 'a>;

/// Read side of a database
pub trait DocumentSource: Send {
    /// Database name used in archive entry names
    fn name(&self) -> &str;

    /// Every collection, internal ones included
    fn collections(&self) -> DatabaseResult<Vec<String>>;

    /// Index definitions of a collection, in declared order
    fn indexes(&self, collection: &str) -> DatabaseResult<Vec<IndexSpec>>;

    /// Stream all documents of a collection
    fn documents(&self, collection: &str) -> DatabaseResult<DocumentStream<'_>>;
}

/// Write side of a database
pub trait DocumentTarget {
    fn name(&self) -> &str;

    /// Insert one document exactly as given
    fn insert(&mut self, collection: &str, raw: Bytes) -> DatabaseResult<()>;

    /// Create an index if it does not already exist
    fn ensure_index(&mut self, collection: &str, spec: &IndexSpec) -> DatabaseResult<()>;
}

/// Whether a collection is internal to the database
pub fn is_system_collection(name: &str) -> bool {
    name.starts_with(SYSTEM_PREFIX)
}
