//! Cache entry storage
//!
//! `DiskStore` is the durable store: one JSON file per entry under
//! `<root>/<digest[..2]>/<digest>.json`. Entries are written to a temporary
//! file, fsynced and renamed into place, so a reader sees either the old
//! entry, the new one, or none. Nothing is ever evicted.
//!
//! `MemoryStore` keeps entries in process memory and is used in tests and
//! for short-lived tools that do not want to touch disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::errors::{CacheError, CacheResult};
use super::key::CacheKey;

/// Distinguishes concurrent temp files of one process.
static WRITE_NONCE: AtomicU64 = AtomicU64::new(0);

/// A stored computation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub operation: String,
    /// Canonical JSON of the arguments
    pub args: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: &CacheKey, value: Value) -> Self {
        Self {
            operation: key.operation().to_string(),
            args: key.args().to_string(),
            value,
            created_at: Utc::now(),
        }
    }
}

/// Keyed storage for cache entries. Writes are atomic per key.
pub trait CacheStore: Send + Sync {
    fn read(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>>;

    fn write(&self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()>;

    /// Returns whether an entry was removed.
    fn remove(&self, key: &CacheKey) -> CacheResult<bool>;
}

/// Durable, content-addressed file store.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CacheError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let digest = key.digest();
        self.root
            .join(&digest[..2])
            .join(format!("{}.json", digest))
    }
}

fn temp_name(key: &CacheKey) -> String {
    format!(
        "{}.{}.{}.tmp",
        key.digest(),
        std::process::id(),
        WRITE_NONCE.fetch_add(1, Ordering::Relaxed)
    )
}

impl CacheStore for DiskStore {
    fn read(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(&path, e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                digest: key.digest().to_string(),
                reason: e.to_string(),
            })
    }

    fn write(&self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()> {
        let path = self.entry_path(key);
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let json = serde_json::to_vec(entry).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let tmp = dir.join(temp_name(key));
        let mut file = File::create(&tmp).map_err(|e| CacheError::io(&tmp, e))?;
        file.write_all(&json).map_err(|e| CacheError::io(&tmp, e))?;
        file.sync_all().map_err(|e| CacheError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|e| CacheError::io(&path, e))?;

        // Make the rename durable.
        let handle = OpenOptions::new()
            .read(true)
            .open(&dir)
            .map_err(|e| CacheError::io(&dir, e))?;
        handle.sync_all().map_err(|e| CacheError::io(&dir, e))?;

        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheError::LockPoisoned("memory store"))?;
        Ok(entries.get(key.digest()).cloned())
    }

    fn write(&self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::LockPoisoned("memory store"))?;
        entries.insert(key.digest().to_string(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::LockPoisoned("memory store"))?;
        Ok(entries.remove(key.digest()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_disk_round_trip_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("genes", &("pbmc",)).unwrap();
        let entry = CacheEntry::new(&key, json!(["CD3E", "MS4A1"]));

        DiskStore::open(temp.path()).unwrap().write(&key, &entry).unwrap();

        let reopened = DiskStore::open(temp.path()).unwrap();
        assert_eq!(reopened.read(&key).unwrap(), Some(entry));
        assert!(reopened.entry_path(&key).exists());
    }

    #[test]
    fn test_disk_missing_entry() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).unwrap();
        let key = CacheKey::new("genes", &("none",)).unwrap();
        assert_eq!(store.read(&key).unwrap(), None);
        assert!(!store.remove(&key).unwrap());
    }

    #[test]
    fn test_disk_no_temp_files_left() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).unwrap();
        let key = CacheKey::new("op", &1).unwrap();
        store.write(&key, &CacheEntry::new(&key, json!(1))).unwrap();

        let dir = store.entry_path(&key).parent().unwrap().to_path_buf();
        let names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", key.digest())]);
    }

    #[test]
    fn test_concurrent_writers_on_one_key() {
        let temp = TempDir::new().unwrap();
        let key = CacheKey::new("genes", &("pbmc",)).unwrap();
        let first = DiskStore::open(temp.path()).unwrap();
        let second = DiskStore::open(temp.path()).unwrap();

        std::thread::scope(|scope| {
            for (i, store) in [&first, &second].into_iter().enumerate() {
                let key = &key;
                scope.spawn(move || {
                    for _ in 0..20 {
                        store.write(key, &CacheEntry::new(key, json!(i))).unwrap();
                    }
                });
            }
        });

        let value = first.read(&key).unwrap().unwrap().value;
        assert!(value == json!(0) || value == json!(1));
        let names: Vec<String> = fs::read_dir(first.entry_path(&key).parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", key.digest())]);
    }

    #[test]
    fn test_temp_names_are_unique() {
        let key = CacheKey::new("op", &1).unwrap();
        assert_ne!(temp_name(&key), temp_name(&key));
    }

    #[test]
    fn test_disk_corrupt_entry_reported() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).unwrap();
        let key = CacheKey::new("op", &1).unwrap();
        let path = store.entry_path(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{not json").unwrap();

        let err = store.read(&key).unwrap_err();
        assert_eq!(err.code(), "OBSMETA_CACHE_CORRUPT");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        let key = CacheKey::new("op", &"x").unwrap();
        store.write(&key, &CacheEntry::new(&key, json!(2))).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.remove(&key).unwrap());
        assert!(store.is_empty());
    }
}
