//! Whole-document key-value persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use uuid::Uuid;

use crate::error::StorageError;

/// Key-value persistence with whole-document semantics.
/// There is no partial-update primitive: every write replaces the document.
pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn write(&mut self, key: &str, document: &Value) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, document: &Value) -> Result<(), StorageError> {
        (**self).write(key, document)
    }
}

// ─── File-backed store ────────────────────────────────────────────

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn write(&mut self, key: &str, document: &Value) -> Result<(), StorageError> {
        let path = self.path_for(key);
        write_json_atomic(&path, document)?;
        tracing::debug!(path = %path.display(), "wrote layout store");
        Ok(())
    }
}

/// Temp file + rename so readers never observe a half-written document.
fn write_json_atomic(path: &Path, value: &Value) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(StorageError::Encode)?;
    let tmp = path.with_extension(format!("tmp.{}", Uuid::new_v4().simple()));
    std::fs::write(&tmp, format!("{json}\n"))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(StorageError::Io(e));
    }
    Ok(())
}

// ─── In-memory store ──────────────────────────────────────────────

/// In-process store for tests and dry runs. Counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: HashMap<String, Value>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without counting it as a write.
    #[must_use]
    pub fn with_document(mut self, key: impl Into<String>, document: Value) -> Self {
        self.docs.insert(key.into(), document);
        self
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn document(&self, key: &str) -> Option<&Value> {
        self.docs.get(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.docs.get(key).cloned())
    }

    fn write(&mut self, key: &str, document: &Value) -> Result<(), StorageError> {
        self.docs.insert(key.to_string(), document.clone());
        self.writes += 1;
        Ok(())
    }
}
