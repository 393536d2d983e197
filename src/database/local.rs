//! Directory-backed database in the mongodump layout
//!
//! ```text
//! <dir>/
//! ├── <collection>.bson          concatenated BSON documents
//! └── <collection>.indexes.json  JSON list of index definitions
//! ```
//!
//! The database name is the directory's final path component.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::{DatabaseError, DatabaseResult, DocumentSource, DocumentStream, DocumentTarget};
use crate::document::{bson, DocumentRecord, IndexSpec};

const DATA_SUFFIX: &str = ".bson";
const INDEX_SUFFIX: &str = ".indexes.json";

#[derive(Debug, Clone)]
pub struct LocalDatabase {
    dir: PathBuf,
    name: String,
}

impl LocalDatabase {
    /// Open an existing database directory
    pub fn open(dir: impl Into<PathBuf>) -> DatabaseResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(DatabaseError::InvalidDatabase(format!(
                "{}: not a directory",
                dir.display()
            )));
        }
        Self::with_dir(dir)
    }

    /// Open a database directory, creating it if needed
    pub fn create(dir: impl Into<PathBuf>) -> DatabaseResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| DatabaseError::io(&dir, e))?;
        Self::with_dir(dir)
    }

    fn with_dir(dir: PathBuf) -> DatabaseResult<Self> {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DatabaseError::InvalidDatabase(format!("{}: no database name", dir.display())))?
            .to_string();
        Ok(Self { dir, name })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str, suffix: &str) -> DatabaseResult<PathBuf> {
        if collection.is_empty() || collection.contains('/') || collection.contains('\\') || collection.starts_with('.') {
            return Err(DatabaseError::InvalidCollection(collection.to_string()));
        }
        Ok(self.dir.join(format!("{}{}", collection, suffix)))
    }

    fn read_indexes(&self, path: &Path) -> DatabaseResult<Vec<IndexSpec>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let payload = fs::read(path).map_err(|e| DatabaseError::io(path, e))?;
        serde_json::from_slice(&payload).map_err(|source| DatabaseError::IndexFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DocumentSource for LocalDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collections(&self) -> DatabaseResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| DatabaseError::io(&self.dir, e))?;
        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| DatabaseError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(stem) = file_name.strip_suffix(INDEX_SUFFIX) {
                names.insert(stem.to_string());
            } else if let Some(stem) = file_name.strip_suffix(DATA_SUFFIX) {
                names.insert(stem.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }

    fn indexes(&self, collection: &str) -> DatabaseResult<Vec<IndexSpec>> {
        let path = self.collection_path(collection, INDEX_SUFFIX)?;
        self.read_indexes(&path)
    }

    fn documents(&self, collection: &str) -> DatabaseResult<DocumentStream<'_>> {
        let path = self.collection_path(collection, DATA_SUFFIX)?;
        if !path.exists() {
            if self.collection_path(collection, INDEX_SUFFIX)?.exists() {
                return Ok(Box::new(std::iter::empty()));
            }
            return Err(DatabaseError::CollectionNotFound(collection.to_string()));
        }
        let file = File::open(&path).map_err(|e| DatabaseError::io(&path, e))?;
        Ok(Box::new(BsonCursor {
            reader: BufReader::new(file),
            database: self.name.clone(),
            collection: collection.to_string(),
            done: false,
        }))
    }
}

impl DocumentTarget for LocalDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&mut self, collection: &str, raw: Bytes) -> DatabaseResult<()> {
        let path = self.collection_path(collection, DATA_SUFFIX)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DatabaseError::io(&path, e))?;
        file.write_all(&raw).map_err(|e| DatabaseError::io(&path, e))
    }

    fn ensure_index(&mut self, collection: &str, spec: &IndexSpec) -> DatabaseResult<()> {
        let path = self.collection_path(collection, INDEX_SUFFIX)?;
        let mut specs = self.read_indexes(&path)?;
        if specs.contains(spec) {
            return Ok(());
        }
        specs.push(spec.clone());

        let file = File::create(&path).map_err(|e| DatabaseError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &specs).map_err(|source| DatabaseError::IndexFile {
            path: path.clone(),
            source,
        })?;
        writer.flush().map_err(|e| DatabaseError::io(&path, e))
    }
}

/// Streams documents out of one `.bson` file
struct BsonCursor {
    reader: BufReader<File>,
    database: String,
    collection: String,
    done: bool,
}

impl Iterator for BsonCursor {
    type Item = DatabaseResult<DocumentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match bson::read_document(&mut self.reader) {
            Ok(Some(raw)) => Some(
                DocumentRecord::from_raw(self.database.clone(), self.collection.clone(), raw).map_err(
                    |source| DatabaseError::Document {
                        collection: self.collection.clone(),
                        source,
                    },
                ),
            ),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                // framing is lost, nothing after this point can be trusted
                self.done = true;
                Some(Err(DatabaseError::Cursor {
                    collection: self.collection.clone(),
                    reason: e.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::bson::DocumentBuilder;
    use crate::document::ObjectId;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(n: u8) -> Bytes {
        Bytes::from(
            DocumentBuilder::new()
                .object_id("_id", ObjectId::from_bytes([n; 12]))
                .string("v", "x")
                .build(),
        )
    }

    #[test]
    fn test_name_is_last_component() {
        let temp = TempDir::new().unwrap();
        let db = LocalDatabase::create(temp.path().join("shop")).unwrap();
        assert_eq!(DocumentSource::name(&db), "shop");
    }

    #[test]
    fn test_open_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            LocalDatabase::open(temp.path().join("missing")),
            Err(DatabaseError::InvalidDatabase(_))
        ));
    }

    #[test]
    fn test_insert_then_stream() {
        let temp = TempDir::new().unwrap();
        let mut db = LocalDatabase::create(temp.path().join("shop")).unwrap();
        db.insert("orders", doc(1)).unwrap();
        db.insert("orders", doc(2)).unwrap();

        let records: Vec<_> = db.documents("orders").unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw, doc(1));
        assert_eq!(records[1].id, ObjectId::from_bytes([2; 12]));
        assert_eq!(records[0].database, "shop");
    }

    #[test]
    fn test_collections_include_index_only() {
        let temp = TempDir::new().unwrap();
        let mut db = LocalDatabase::create(temp.path().join("shop")).unwrap();
        db.insert("orders", doc(1)).unwrap();
        db.ensure_index("empty", &IndexSpec::new(json!({"name": "a_1"}))).unwrap();
        fs::write(db.dir().join("notes.txt"), b"ignored").unwrap();

        assert_eq!(db.collections().unwrap(), vec!["empty", "orders"]);
        assert_eq!(db.documents("empty").unwrap().count(), 0);
        assert!(db.documents("missing").is_err());
    }

    #[test]
    fn test_ensure_index_appends_once() {
        let temp = TempDir::new().unwrap();
        let mut db = LocalDatabase::create(temp.path().join("shop")).unwrap();
        let a = IndexSpec::new(json!({"name": "a_1", "key": {"a": 1}}));
        let b = IndexSpec::new(json!({"name": "b_1", "key": {"b": 1}}));
        db.ensure_index("orders", &a).unwrap();
        db.ensure_index("orders", &b).unwrap();
        db.ensure_index("orders", &a).unwrap();

        assert_eq!(db.indexes("orders").unwrap(), vec![a, b]);
        assert!(db.indexes("other").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_ends_cursor() {
        let temp = TempDir::new().unwrap();
        let db = LocalDatabase::create(temp.path().join("shop")).unwrap();
        let mut bytes = doc(1).to_vec();
        bytes.extend_from_slice(&[0x40, 0x00]);
        fs::write(db.dir().join("orders.bson"), bytes).unwrap();

        let results: Vec<_> = db.documents("orders").unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DatabaseError::Cursor { .. })));
    }

    #[test]
    fn test_rejects_path_like_collection() {
        let temp = TempDir::new().unwrap();
        let mut db = LocalDatabase::create(temp.path().join("shop")).unwrap();
        assert!(matches!(
            db.insert("../escape", doc(1)),
            Err(DatabaseError::InvalidCollection(_))
        ));
    }
}
