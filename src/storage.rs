use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

pub const META_FILE: &str = "db_meta.json";
pub const DATA_DIR: &str = "data";

/// Names one persisted document: the schema map, or one table's records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Schema,
    Table(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Schema => f.write_str("schema"),
            Key::Table(name) => write!(f, "table {}", name),
        }
    }
}

/// Named JSON documents addressed by [`Key`]. Callers see bytes only;
/// where they live is up to the implementation.
pub trait Storage {
    /// `Ok(None)` when the document has never been saved.
    fn load(&self, key: &Key) -> Result<Option<Vec<u8>>, StorageError>;
    fn save(&mut self, key: &Key, bytes: &[u8]) -> Result<(), StorageError>;
    /// Removing an absent document is not an error.
    fn remove(&mut self, key: &Key) -> Result<(), StorageError>;
}

/// Loads and decodes a document. Unreadable or corrupt documents are
/// logged and treated as absent.
pub fn load_json<S, T>(storage: &S, key: &Key) -> T
where
    S: Storage + ?Sized,
    T: DeserializeOwned + Default,
{
    let bytes = match storage.load(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return T::default(),
        Err(e) => {
            log::warn!("{}; treating {} as empty", e, key);
            return T::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => {
            log::debug!("loaded {} ({} bytes)", key, bytes.len());
            value
        }
        Err(e) => {
            log::warn!("{} holds invalid JSON ({}); treating it as empty", key, e);
            T::default()
        }
    }
}

pub fn save_json<S, T>(storage: &mut S, key: &Key, value: &T) -> Result<(), StorageError>
where
    S: Storage + ?Sized,
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.save(key, &bytes)?;
    log::debug!("saved {} ({} bytes)", key, bytes.len());
    Ok(())
}

/// Documents as JSON files: the schema at `<root>/db_meta.json`, each
/// table at `<root>/data/<table>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: &Key) -> PathBuf {
        match key {
            Key::Schema => self.root.join(META_FILE),
            Key::Table(name) => self.root.join(DATA_DIR).join(format!("{}.json", name)),
        }
    }

    fn io_error(key: &Key, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl Storage for JsonFileStore {
    fn load(&self, key: &Key) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn save(&mut self, key: &Key, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Self::io_error(key, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| Self::io_error(key, e))
    }

    fn remove(&mut self, key: &Key) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// In-process document map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: HashMap<Key, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.documents.contains_key(key)
    }
}

impl Storage for MemoryStore {
    fn load(&self, key: &Key) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.documents.get(key).cloned())
    }

    fn save(&mut self, key: &Key, bytes: &[u8]) -> Result<(), StorageError> {
        self.documents.insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &Key) -> Result<(), StorageError> {
        self.documents.remove(key);
        Ok(())
    }
}
