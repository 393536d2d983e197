//! Index Handling Tests
//!
//! Tests for:
//! - Index lists travel ahead of a collection's documents
//! - Collections with indexes but no documents keep their indexes
//! - A second index entry for one collection stops the restore
//! - Indexes are applied only after every document is loaded

use std::sync::Arc;

use docarchive::database::MemoryDatabase;
use docarchive::document::bson::DocumentBuilder;
use docarchive::document::{IndexSpec, ObjectId};
use docarchive::dump::{DumpConfig, DumpManager};
use docarchive::file_storage::{LocalBackend, ObjectSink, StorageBackend, StorageTarget};
use docarchive::observability::Progress;
use docarchive::restore::{read_entries, ChunkEntry, RestoreConfig, RestoreErrorCode, RestoreManager};
use serde_json::json;
use tar::{Builder, Header};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn doc(n: u8) -> Vec<u8> {
    DocumentBuilder::new()
        .object_id("_id", ObjectId::from_bytes([n; 12]))
        .int32("n", n as i32)
        .build()
}

fn local(temp: &TempDir) -> (Arc<LocalBackend>, StorageTarget) {
    let backend = Arc::new(LocalBackend::new(temp.path()));
    let target = StorageTarget {
        root: "dump".into(),
        backend: backend.clone(),
    };
    (backend, target)
}

fn dump_config() -> DumpConfig {
    DumpConfig {
        target: "unused".into(),
        compression: false,
        progress: false,
        ..DumpConfig::default()
    }
}

fn restore_config() -> RestoreConfig {
    RestoreConfig {
        source: "unused".into(),
        compression: false,
        progress: false,
        ..RestoreConfig::default()
    }
}

fn write_chunk(backend: &LocalBackend, path: &str, entries: &[(&str, &[u8])]) {
    let mut builder = Builder::new(backend.save(path).unwrap());
    for (name, data) in entries {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, name, *data).unwrap();
    }
    let sink: Box<dyn ObjectSink> = builder.into_inner().unwrap();
    sink.commit().unwrap();
}

fn chunk_paths(backend: &LocalBackend) -> Vec<String> {
    let mut paths = Vec::new();
    backend
        .walk("dump", &mut |path, err| {
            assert!(err.is_none());
            paths.push(path.to_string());
            Ok(())
        })
        .unwrap();
    paths
}

// =============================================================================
// Dump Layout
// =============================================================================

/// Collection a has three documents and one index, b is empty.
#[test]
fn test_dump_layout_indexes_before_documents() {
    let temp = TempDir::new().unwrap();
    let (backend, target) = local(&temp);

    let source = MemoryDatabase::new("test");
    for n in 1..=3 {
        source.seed("a", doc(n));
    }
    source.seed_index("a", IndexSpec::new(json!({"name": "n_1", "key": {"n": 1}})));
    source.create_collection("b");

    let summary = DumpManager::run(&dump_config(), Box::new(source), target, &Progress::hidden()).unwrap();
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.chunks, 1);

    let paths = chunk_paths(&backend);
    assert_eq!(paths.len(), 1);

    let mut entries = Vec::new();
    read_entries(&paths[0], backend.fetch(&paths[0]).unwrap(), |entry| {
        entries.push(entry);
        Ok(())
    })
    .unwrap();

    assert_eq!(entries.len(), 4);
    match &entries[0] {
        ChunkEntry::Indexes { collection, payload } => {
            assert_eq!(collection, "a");
            let specs = IndexSpec::decode_list(payload).unwrap();
            assert_eq!(specs.len(), 1);
            assert_eq!(specs[0].name(), Some("n_1"));
        }
        other => panic!("expected index entry first, got {:?}", other),
    }
    for (n, entry) in entries[1..].iter().enumerate() {
        match entry {
            ChunkEntry::Document { collection, id, .. } => {
                assert_eq!(collection, "a");
                assert_eq!(*id, ObjectId::from_bytes([n as u8 + 1; 12]));
            }
            other => panic!("expected document entry, got {:?}", other),
        }
    }

    let mut restored = MemoryDatabase::new("restored");
    let summary = RestoreManager::run(
        &restore_config(),
        &mut restored,
        StorageTarget {
            root: "dump".into(),
            backend,
        },
        &Progress::hidden(),
    )
    .unwrap();
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.collections_indexed, 1);
    assert_eq!(summary.indexes_applied, 1);
    assert_eq!(restored.indexes_in("a").len(), 1);
    assert!(restored.indexes_in("b").is_empty());
}

#[test]
fn test_indexes_survive_for_empty_collection() {
    let temp = TempDir::new().unwrap();
    let (backend, target) = local(&temp);

    let source = MemoryDatabase::new("test");
    source.seed_index("c", IndexSpec::new(json!({"name": "x_1"})));
    source.seed_index("c", IndexSpec::new(json!({"name": "y_1"})));

    let summary = DumpManager::run(&dump_config(), Box::new(source), target, &Progress::hidden()).unwrap();
    assert_eq!(summary.documents, 0);
    assert_eq!(summary.chunks, 1);

    let mut restored = MemoryDatabase::new("restored");
    let summary = RestoreManager::run(
        &restore_config(),
        &mut restored,
        StorageTarget {
            root: "dump".into(),
            backend,
        },
        &Progress::hidden(),
    )
    .unwrap();
    assert_eq!(summary.documents, 0);
    assert_eq!(summary.indexes_applied, 2);
    let names: Vec<String> = restored
        .indexes_in("c")
        .iter()
        .filter_map(|s| s.name().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["x_1".to_string(), "y_1".to_string()]);
}

// =============================================================================
// Restore Failures
// =============================================================================

#[test]
fn test_duplicate_index_entries_across_chunks() {
    let temp = TempDir::new().unwrap();
    let (backend, target) = local(&temp);
    write_chunk(&backend, "dump/dump.1", &[("test/a/indexes.json", &br#"[{"name":"x_1"}]"#[..])]);
    write_chunk(&backend, "dump/dump.2", &[("test/a/indexes.json", &br#"[{"name":"y_1"}]"#[..])]);

    let restored = MemoryDatabase::new("restored");
    let mut sink = restored.clone();
    let err = RestoreManager::run(&restore_config(), &mut sink, target, &Progress::hidden()).unwrap_err();
    assert_eq!(err.code(), RestoreErrorCode::RestoreDuplicateIndex);
    assert!(restored.indexes_in("a").is_empty());
}

#[test]
fn test_duplicate_index_ignored_when_indexes_disabled() {
    let temp = TempDir::new().unwrap();
    let (backend, target) = local(&temp);
    write_chunk(&backend, "dump/dump.1", &[("test/a/indexes.json", &b"[]"[..])]);
    write_chunk(&backend, "dump/dump.2", &[("test/a/indexes.json", &b"[]"[..])]);

    let mut config = restore_config();
    config.indexes = false;
    let mut sink = MemoryDatabase::new("restored");
    assert!(RestoreManager::run(&config, &mut sink, target, &Progress::hidden()).is_ok());
}

#[test]
fn test_index_failure_stops_after_documents_loaded() {
    let temp = TempDir::new().unwrap();
    let (backend, target) = local(&temp);
    let first = doc(1);
    let second = doc(2);
    write_chunk(
        &backend,
        "dump/dump.1",
        &[
            ("test/a/indexes.json", &br#"[{"name":"x_1"}]"#[..]),
            ("test/a/010101010101010101010101", &first[..]),
        ],
    );
    write_chunk(&backend, "dump/dump.2", &[("test/a/020202020202020202020202", &second[..])]);

    let restored = MemoryDatabase::new("restored");
    restored.fail_indexes_on("a");
    let mut sink = restored.clone();
    let err = RestoreManager::run(&restore_config(), &mut sink, target, &Progress::hidden()).unwrap_err();

    assert_eq!(err.code(), RestoreErrorCode::RestoreIndex);
    assert_eq!(restored.documents_in("a").len(), 2);
}

#[test]
fn test_malformed_index_payload() {
    let temp = TempDir::new().unwrap();
    let (backend, target) = local(&temp);
    write_chunk(&backend, "dump/dump.1", &[("test/a/indexes.json", &b"{oops"[..])]);

    let mut sink = MemoryDatabase::new("restored");
    let err = RestoreManager::run(&restore_config(), &mut sink, target, &Progress::hidden()).unwrap_err();
    assert_eq!(err.code(), RestoreErrorCode::RestoreInvalidEntry);
}
