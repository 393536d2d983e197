//! docarchive - chunked dump and restore for document databases
//!
//! Documents are streamed into size-bounded tar chunks on a local
//! directory or an S3-style bucket, optionally gzip-compressed, and
//! loaded back in chunk order with indexes applied last.

pub mod cli;
pub mod database;
pub mod document;
pub mod dump;
pub mod file_storage;
pub mod observability;
pub mod restore;
