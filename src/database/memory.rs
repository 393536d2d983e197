//! In-process database
//!
//! Clones share one store, so a test can hand a clone to a dump or
//! restore and inspect the original afterwards.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use super::{DatabaseError, DatabaseResult, DocumentSource, DocumentStream, DocumentTarget};
use crate::document::{DocumentRecord, IndexSpec};

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Bytes>,
    indexes: Vec<IndexSpec>,
}

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    inserts_left: Option<usize>,
    failing_index: Option<String>,
    failing_cursor: Option<String>,
}

/// Shared in-memory document store
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    name: String,
    state: Arc<Mutex<State>>,
}

impl MemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create an empty collection
    pub fn create_collection(&self, collection: &str) {
        self.lock().collections.entry(collection.to_string()).or_default();
    }

    /// Append a document without going through failure injection
    pub fn seed(&self, collection: &str, raw: impl Into<Bytes>) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .documents
            .push(raw.into());
    }

    /// Declare an index without going through failure injection
    pub fn seed_index(&self, collection: &str, spec: IndexSpec) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .indexes
            .push(spec);
    }

    /// Documents of a collection in insertion order
    pub fn documents_in(&self, collection: &str) -> Vec<Bytes> {
        self.lock()
            .collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Indexes of a collection in creation order
    pub fn indexes_in(&self, collection: &str) -> Vec<IndexSpec> {
        self.lock()
            .collections
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.lock().collections.keys().cloned().collect()
    }

    /// Allow `n` more inserts, then fail every following one
    pub fn fail_inserts_after(&self, n: usize) {
        self.lock().inserts_left = Some(n);
    }

    /// Fail every `ensure_index` on a collection
    pub fn fail_indexes_on(&self, collection: &str) {
        self.lock().failing_index = Some(collection.to_string());
    }

    /// End the collection's cursor with an error after its last document
    pub fn fail_cursor_on(&self, collection: &str) {
        self.lock().failing_cursor = Some(collection.to_string());
    }
}

impl DocumentSource for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collections(&self) -> DatabaseResult<Vec<String>> {
        Ok(self.collection_names())
    }

    fn indexes(&self, collection: &str) -> DatabaseResult<Vec<IndexSpec>> {
        let state = self.lock();
        state
            .collections
            .get(collection)
            .map(|c| c.indexes.clone())
            .ok_or_else(|| DatabaseError::CollectionNotFound(collection.to_string()))
    }

    fn documents(&self, collection: &str) -> DatabaseResult<DocumentStream<'_>> {
        let state = self.lock();
        let docs = state
            .collections
            .get(collection)
            .map(|c| c.documents.clone())
            .ok_or_else(|| DatabaseError::CollectionNotFound(collection.to_string()))?;
        let fail_cursor = state.failing_cursor.as_deref() == Some(collection);
        drop(state);

        let database = self.name.clone();
        let name = collection.to_string();
        let records = docs.into_iter().map(move |raw| {
            DocumentRecord::from_raw(database.clone(), name.clone(), raw).map_err(|source| {
                DatabaseError::Document {
                    collection: name.clone(),
                    source,
                }
            })
        });

        let trailer = fail_cursor.then(|| {
            Err(DatabaseError::Cursor {
                collection: collection.to_string(),
                reason: "cursor killed".into(),
            })
        });
        Ok(Box::new(records.chain(trailer)))
    }
}

impl DocumentTarget for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&mut self, collection: &str, raw: Bytes) -> DatabaseResult<()> {
        let mut state = self.lock();
        if let Some(left) = state.inserts_left.as_mut() {
            if *left == 0 {
                return Err(DatabaseError::Insert {
                    collection: collection.to_string(),
                    reason: "injected insert failure".into(),
                });
            }
            *left -= 1;
        }
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .documents
            .push(raw);
        Ok(())
    }

    fn ensure_index(&mut self, collection: &str, spec: &IndexSpec) -> DatabaseResult<()> {
        let mut state = self.lock();
        if state.failing_index.as_deref() == Some(collection) {
            return Err(DatabaseError::Index {
                collection: collection.to_string(),
                reason: "injected index failure".into(),
            });
        }
        let indexes = &mut state.collections.entry(collection.to_string()).or_default().indexes;
        if !indexes.contains(spec) {
            indexes.push(spec.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::bson::DocumentBuilder;
    use crate::document::ObjectId;
    use serde_json::json;

    fn doc(n: u8) -> Vec<u8> {
        DocumentBuilder::new()
            .object_id("_id", ObjectId::from_bytes([n; 12]))
            .int32("n", n as i32)
            .build()
    }

    #[test]
    fn test_clones_share_state() {
        let db = MemoryDatabase::new("test");
        let mut handle = db.clone();
        handle.insert("people", Bytes::from(doc(1))).unwrap();
        assert_eq!(db.documents_in("people").len(), 1);
    }

    #[test]
    fn test_stream_documents() {
        let db = MemoryDatabase::new("test");
        db.seed("people", doc(1));
        db.seed("people", doc(2));

        let records: Vec<_> = db.documents("people").unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].database, "test");
        assert_eq!(records[1].id, ObjectId::from_bytes([2; 12]));
    }

    #[test]
    fn test_document_without_id_is_document_level_error() {
        let db = MemoryDatabase::new("test");
        db.seed("people", DocumentBuilder::new().string("_id", "x").build());
        db.seed("people", doc(2));

        let results: Vec<_> = db.documents("people").unwrap().collect();
        assert!(results[0].as_ref().unwrap_err().is_document_level());
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_cursor_failure_after_documents() {
        let db = MemoryDatabase::new("test");
        db.seed("people", doc(1));
        db.fail_cursor_on("people");

        let results: Vec<_> = db.documents("people").unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(DatabaseError::Cursor { .. })));
    }

    #[test]
    fn test_missing_collection() {
        let db = MemoryDatabase::new("test");
        assert!(matches!(
            db.documents("nope"),
            Err(DatabaseError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_insert_failure_injection() {
        let mut db = MemoryDatabase::new("test");
        db.fail_inserts_after(1);
        db.insert("people", Bytes::from(doc(1))).unwrap();
        assert!(db.insert("people", Bytes::from(doc(2))).is_err());
        assert_eq!(db.documents_in("people").len(), 1);
    }

    #[test]
    fn test_ensure_index_is_idempotent() {
        let mut db = MemoryDatabase::new("test");
        let spec = IndexSpec::new(json!({"name": "a_1", "key": {"a": 1}}));
        db.ensure_index("people", &spec).unwrap();
        db.ensure_index("people", &spec).unwrap();
        assert_eq!(db.indexes_in("people"), vec![spec.clone()]);

        db.fail_indexes_on("people");
        assert!(db.ensure_index("people", &spec).is_err());
    }
}
