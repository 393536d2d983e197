//! # Local Filesystem Backend

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use super::backend::{ObjectSink, ObjectSource, StorageBackend, WalkFn};
use super::errors::{StorageError, StorageResult};

/// Local filesystem storage backend
///
/// Logical paths map 1:1 onto files below `root`.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new local backend
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem directory this backend is rooted at
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn relative_name(&self, full: &Path) -> String {
        full.strip_prefix(&self.root)
            .unwrap_or(full)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn walk_dir(&self, dir: &Path, visit: &mut WalkFn<'_>) -> StorageResult<()> {
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(e) => {
                let name = self.relative_name(dir);
                return visit(&name, Some(StorageError::io(name.clone(), e)));
            }
        };

        let mut entries = Vec::new();
        for entry in listing {
            match entry {
                Ok(entry) => entries.push(entry.path()),
                Err(e) => {
                    let name = self.relative_name(dir);
                    visit(&name, Some(StorageError::io(name.clone(), e)))?;
                }
            }
        }
        entries.sort();

        for path in entries {
            if is_partial(&path) {
                continue;
            }
            if path.is_dir() {
                self.walk_dir(&path, visit)?;
            } else {
                visit(&self.relative_name(&path), None)?;
            }
        }
        Ok(())
    }
}

impl StorageBackend for LocalBackend {
    fn save(&self, path: &str) -> StorageResult<Box<dyn ObjectSink>> {
        let full_path = self.full_path(path)?;

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(path, e))?;
        }

        // Written beside the target, renamed into place on commit
        let partial = partial_path(&full_path);
        let file = File::create(&partial).map_err(|e| StorageError::io(path, e))?;
        Ok(Box::new(LocalSink {
            path: path.to_string(),
            target: full_path,
            partial,
            writer: Some(BufWriter::new(file)),
            committed: false,
        }))
    }

    fn fetch(&self, path: &str) -> StorageResult<ObjectSource> {
        let full_path = self.full_path(path)?;

        File::open(&full_path)
            .map(|f| Box::new(f) as ObjectSource)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    StorageError::ObjectNotFound(path.to_string())
                } else {
                    StorageError::io(path, e)
                }
            })
    }

    fn walk(&self, root: &str, visit: &mut WalkFn<'_>) -> StorageResult<()> {
        let full_path = self.full_path(root)?;

        match fs::metadata(&full_path) {
            Ok(meta) if meta.is_dir() => self.walk_dir(&full_path, visit),
            Ok(_) => visit(&self.relative_name(&full_path), None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                visit(root, Some(StorageError::ObjectNotFound(root.to_string())))
            }
            Err(e) => visit(root, Some(StorageError::io(root, e))),
        }
    }
}

const PARTIAL_SUFFIX: &str = ".partial";

fn partial_path(full: &Path) -> PathBuf {
    let mut name = full.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn is_partial(path: &Path) -> bool {
    path.to_string_lossy().ends_with(PARTIAL_SUFFIX)
}

/// File sink; commit flushes, fsyncs and renames into place
///
/// A sink dropped without a successful commit removes its partial file.
struct LocalSink {
    path: String,
    target: PathBuf,
    partial: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl LocalSink {
    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink already closed"))
    }
}

impl Write for LocalSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl ObjectSink for LocalSink {
    fn commit(mut self: Box<Self>) -> StorageResult<()> {
        let writer = self.writer.take().ok_or_else(|| {
            StorageError::io(
                self.path.clone(),
                io::Error::new(io::ErrorKind::BrokenPipe, "sink already closed"),
            )
        })?;
        let file = writer
            .into_inner()
            .map_err(|e| StorageError::io(self.path.clone(), e.into_error()))?;
        file.sync_all()
            .map_err(|e| StorageError::io(self.path.clone(), e))?;
        fs::rename(&self.partial, &self.target)
            .map_err(|e| StorageError::io(self.path.clone(), e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for LocalSink {
    fn drop(&mut self) {
        if !self.committed {
            self.writer.take();
            let _ = fs::remove_file(&self.partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn save_bytes(backend: &LocalBackend, path: &str, data: &[u8]) {
        let mut sink = backend.save(path).unwrap();
        sink.write_all(data).unwrap();
        sink.commit().unwrap();
    }

    fn walk_all(backend: &LocalBackend, root: &str) -> StorageResult<Vec<String>> {
        let mut seen = Vec::new();
        backend.walk(root, &mut |path, err| {
            if let Some(err) = err {
                return Err(err);
            }
            seen.push(path.to_string());
            Ok(())
        })?;
        Ok(seen)
    }

    #[test]
    fn test_save_fetch() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        save_bytes(&backend, "mongotooltest/object", b"foo");

        let mut data = String::new();
        backend
            .fetch("mongotooltest/object")
            .unwrap()
            .read_to_string(&mut data)
            .unwrap();
        assert_eq!(data, "foo");
    }

    #[test]
    fn test_nested_directories_created() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        save_bytes(&backend, "a/b/c/file.txt", b"nested");
        assert!(temp.path().join("a/b/c/file.txt").exists());
    }

    #[test]
    fn test_walk_is_recursive_and_sorted() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        save_bytes(&backend, "dump/z", b"1");
        save_bytes(&backend, "dump/a", b"2");
        save_bytes(&backend, "dump/sub/m", b"3");
        save_bytes(&backend, "other/x", b"4");

        let seen = walk_all(&backend, "dump").unwrap();
        assert_eq!(seen, vec!["dump/a", "dump/sub/m", "dump/z"]);

        let everything = walk_all(&backend, "").unwrap();
        assert_eq!(everything.len(), 4);
    }

    #[test]
    fn test_walk_missing_root_reports_error() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        let result = walk_all(&backend, "nope");
        assert!(matches!(result, Err(StorageError::ObjectNotFound(_))));
    }

    #[test]
    fn test_visit_error_aborts_walk() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());
        save_bytes(&backend, "a", b"1");
        save_bytes(&backend, "b", b"2");

        let mut visits = 0;
        let result = backend.walk("", &mut |_, _| {
            visits += 1;
            Err(StorageError::WalkAborted("stop".into()))
        });
        assert!(result.is_err());
        assert_eq!(visits, 1);
    }

    #[test]
    fn test_uncommitted_sink_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        let mut sink = backend.save("dump/chunk").unwrap();
        sink.write_all(b"half").unwrap();
        assert!(walk_all(&backend, "dump").unwrap().is_empty());
        drop(sink);

        assert!(!temp.path().join("dump/chunk").exists());
        assert!(!temp.path().join("dump/chunk.partial").exists());
        assert!(matches!(
            backend.fetch("dump/chunk"),
            Err(StorageError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_not_found() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        let result = backend.fetch("nonexistent.txt");
        assert!(matches!(result, Err(StorageError::ObjectNotFound(_))));
    }

    #[test]
    fn test_parent_escape_rejected() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        assert!(matches!(
            backend.save("../escape"),
            Err(StorageError::InvalidPath(_))
        ));
    }
}
