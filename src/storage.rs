//! Key-value persistence for the storefront.
//!
//! Every collection is stored as a single JSON array under a fixed key, so
//! repositories do read-modify-write cycles. [`Storage::lock`] serializes those
//! cycles across services.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use dashmap::DashMap;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

pub const RAFFLES_KEY: &str = "ds_raffles_list";
pub const PURCHASES_KEY: &str = "ds_purchases";
pub const USERS_KEY: &str = "ds_users";
pub const WINNERS_KEY: &str = "ds_winners";

pub trait Store: Send + Sync + 'static {
    fn read(&self, key: &str) -> Result<Option<Value>, anyhow::Error>;
    fn write(&self, key: &str, value: Value) -> Result<(), anyhow::Error>;
    fn remove(&self, key: &str) -> Result<(), anyhow::Error>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Value>, anyhow::Error> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn write(&self, key: &str, value: Value) -> Result<(), anyhow::Error> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn default_dir() -> Result<PathBuf, anyhow::Error> {
        let dirs = ProjectDirs::from("br", "dollynstorm", "dollynstorm")
            .ok_or_else(|| anyhow!("Could not determine a data directory"))?;

        Ok(dirs.data_dir().to_path_buf())
    }

    fn path(&self, key: &str) -> Result<PathBuf, anyhow::Error> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("Invalid storage key: {:?}", key);
        }

        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Store for FileStore {
    fn read(&self, key: &str) -> Result<Option<Value>, anyhow::Error> {
        match fs::read(self.path(key)?) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: Value) -> Result<(), anyhow::Error> {
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec_pretty(&value)?)?;
        fs::rename(&tmp, &path)?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        match fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Shared handle to the configured store.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn Store>,
    lock: Arc<Mutex<()>>,
}

impl Storage {
    pub fn new(store: impl Store) -> Self {
        Self {
            store: Arc::new(store),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, anyhow::Error> {
        match self.store.read(key)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn write_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), anyhow::Error> {
        self.store.write(key, serde_json::to_value(items)?)
    }

    pub fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        self.store.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_read_write_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.read("a").unwrap(), None);

        store.write("a", json!([1, 2])).unwrap();
        assert_eq!(store.read("a").unwrap(), Some(json!([1, 2])));

        store.remove("a").unwrap();
        assert_eq!(store.read("a").unwrap(), None);
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::new(dir.path()).unwrap();
        store.write(PURCHASES_KEY, json!([{"id": "p1"}])).unwrap();

        let reopened = FileStore::new(dir.path()).unwrap();
        assert_eq!(
            reopened.read(PURCHASES_KEY).unwrap(),
            Some(json!([{"id": "p1"}]))
        );

        reopened.remove(PURCHASES_KEY).unwrap();
        reopened.remove(PURCHASES_KEY).unwrap();
        assert_eq!(reopened.read(PURCHASES_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        assert!(store.read("../etc/passwd").is_err());
        assert!(store.write("", json!(null)).is_err());
    }

    #[test]
    fn typed_lists() {
        let storage = Storage::memory();
        assert!(storage.read_list::<String>(USERS_KEY).unwrap().is_empty());

        storage
            .write_list(USERS_KEY, &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(
            storage.read_list::<String>(USERS_KEY).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
