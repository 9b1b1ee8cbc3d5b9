//! JSON-file-backed key-value store, so a CLI keeps its session between runs.
//!
//! TRADE-OFFS
//! ==========
//! Every write rewrites the whole file. The store holds a handful of small
//! keys, so simplicity wins over incremental writes.

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::KeyValueStore;
use crate::error::StorageError;

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Unavailable(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Unavailable(e.to_string())),
        }
    }

    fn save(&self, key: &str, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(items)
            .map_err(|e| StorageError::Operation { key: key.to_owned(), message: e.to_string() })?;
        std::fs::write(&self.path, raw).map_err(|e| StorageError::Operation { key: key.to_owned(), message: e.to_string() })
    }

    fn update<F>(&self, key: &str, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _held = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut items = self.load()?;
        if apply(&mut items) {
            self.save(key, &items)?;
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.load()?.into_keys().collect())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(key, |items| {
            items.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(key, |items| items.remove(key).is_some())
    }
}
