//! Durable key-value storage.
//!
//! Stores persist their snapshots through the [`Storage`] trait. Two
//! backends are provided: an in-memory map and a directory holding one
//! JSON file per key. Neither coordinates concurrent writers; the last
//! write to a key wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

/// A string-valued key-value store.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
}

/// Storage held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Storage backed by a directory, one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the key files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `key`. ASCII letters, digits and `-` are kept; every other
    /// byte, `_` included, becomes `_XX` in hex, so distinct keys never
    /// share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("_{byte:02X}"));
            }
        }
        self.dir.join(format!("{name}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Writes a sibling temp file and renames it over the key's file, so
    /// readers see either the old or the new contents.
    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let staged = path.with_extension("json.tmp");
        fs::write(&staged, value).map_err(|source| StorageError::Io {
            path: staged.clone(),
            source,
        })?;
        fs::rename(&staged, &path).map_err(|source| StorageError::Io { path, source })
    }
}

/// Read and parse the JSON stored under `key`.
///
/// Absent keys, read failures and malformed content all yield
/// `T::default()`; the latter two are logged.
pub fn load_json<T>(storage: &dyn Storage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            tracing::warn!(key, error = %err, "could not read persisted state, using defaults");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(key, error = %err, "persisted state is malformed, using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.get("missing").unwrap().is_none());

        storage.set("k", "v1".into()).unwrap();
        storage.set("k", "v2".into()).unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let storage = FileStorage::open(dir.path().join("state")).unwrap();
        storage.set("store:dutch-checker", "{}".into()).unwrap();
        assert!(storage.dir().join("store_3Adutch-checker.json").exists());

        let reopened = FileStorage::open(dir.path().join("state")).unwrap();
        assert_eq!(
            reopened.get("store:dutch-checker").unwrap().as_deref(),
            Some("{}")
        );
        assert!(reopened.get("history").unwrap().is_none());
    }

    #[test]
    fn similar_keys_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("store:a", "colon".into()).unwrap();
        storage.set("store_a", "underscore".into()).unwrap();
        storage.set("store/a", "slash".into()).unwrap();

        assert_eq!(storage.get("store:a").unwrap().as_deref(), Some("colon"));
        assert_eq!(storage.get("store_a").unwrap().as_deref(), Some("underscore"));
        assert_eq!(storage.get("store/a").unwrap().as_deref(), Some("slash"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn load_json_tolerates_malformed_content() {
        let storage = MemoryStorage::new();
        storage.set("broken", "{not json".into()).unwrap();
        storage.set("wrong-shape", "[1, 2, 3]".into()).unwrap();

        let broken: HashMap<String, String> = load_json(&storage, "broken");
        assert!(broken.is_empty());

        let wrong: HashMap<String, String> = load_json(&storage, "wrong-shape");
        assert!(wrong.is_empty());

        let absent: Vec<String> = load_json(&storage, "absent");
        assert!(absent.is_empty());
    }
}
