//! Option Store Implementations
//!
//! In-memory and JSON-file backed implementations of [`OptionStore`].
//! Single-key writes are atomic; read-modify-write sequences spanning
//! several calls are not, and the last writer wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use super::error::{HostError, HostResult};
use super::traits::OptionStore;

/// Option store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: Mutex<BTreeMap<String, Value>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored option
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.options.lock().clone()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get_option(&self, name: &str) -> Option<Value> {
        self.options.lock().get(name).cloned()
    }

    fn update_option(&self, name: &str, value: Value) -> HostResult<()> {
        self.options.lock().insert(name.to_string(), value);
        Ok(())
    }

    fn delete_option(&self, name: &str) -> HostResult<()> {
        self.options.lock().remove(name);
        Ok(())
    }
}

/// Option store persisted as a single JSON object on disk
#[derive(Debug)]
pub struct JsonFileOptionStore {
    path: PathBuf,
    cache: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileOptionStore {
    /// Open the store, reading any existing file. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> HostResult<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| HostError::storage(format!("Failed to read {}: {}", path.display(), e)))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened option store {} ({} options)", path.display(), cache.len());
        Ok(Self { path, cache: Mutex::new(cache) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, options: &BTreeMap<String, Value>) -> HostResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(options)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .map_err(|e| HostError::storage(format!("Failed to write {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| HostError::storage(format!("Failed to replace {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

impl OptionStore for JsonFileOptionStore {
    fn get_option(&self, name: &str) -> Option<Value> {
        self.cache.lock().get(name).cloned()
    }

    fn update_option(&self, name: &str, value: Value) -> HostResult<()> {
        let mut options = self.cache.lock();
        let previous = options.insert(name.to_string(), value);
        if let Err(e) = self.persist(&options) {
            // Keep the cache consistent with what is on disk
            match previous {
                Some(old) => options.insert(name.to_string(), old),
                None => options.remove(name),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete_option(&self, name: &str) -> HostResult<()> {
        let mut options = self.cache.lock();
        if let Some(previous) = options.remove(name) {
            if let Err(e) = self.persist(&options) {
                options.insert(name.to_string(), previous);
                return Err(e);
            }
        }
        Ok(())
    }
}
