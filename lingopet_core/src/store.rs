//! Key-value persistence with file locking.
//!
//! The app keeps every record (words, daily stats) under a string key in a
//! single JSON object, mirroring the browser's local storage. There are no
//! transactional guarantees across keys.

use crate::{Error, Result};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Computes a key's new value from its current one
pub type UpdateFn<'a> = Box<dyn FnOnce(Option<Value>) -> Result<Value> + 'a>;

/// Store backing all persistent records
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Atomic read-modify-write of one key
    ///
    /// No other writer touches the key between the read and the write. If
    /// `f` fails, nothing is written.
    fn update(&self, key: &str, f: UpdateFn<'_>) -> Result<()>;
}

/// JSON-object file store with shared/exclusive locking
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store.json".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Load the whole object
    ///
    /// Returns an empty object if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty object.
    fn load_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            tracing::debug!("No store file at {:?}, starting empty", self.path);
            return Ok(Map::new());
        }

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open store {:?}: {}. Using empty store.", self.path, e);
                return Ok(Map::new());
            }
        };

        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read store {:?}: {}. Using empty store.", self.path, e);
            return Ok(Map::new());
        }

        file.unlock()?;

        match serde_json::from_str::<Map<String, Value>>(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!("Failed to parse store {:?}: {}. Using empty store.", self.path, e);
                Ok(Map::new())
            }
        }
    }

    /// Atomically replace the file: temp file, sync, rename
    fn save_map(&self, map: &Map<String, Value>) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store(format!("store path {:?} has no parent", self.path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(map)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl JsonFileStore {
    /// Run a read-modify-write of the whole object under the sidecar lock
    ///
    /// The lock serializes writers across threads and processes.
    fn locked_modify<F>(&self, modify: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<()>,
    {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        let result = self.load_map().and_then(|mut map| {
            modify(&mut map)?;
            self.save_map(&map)
        });

        lock.unlock()?;
        result
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut map = self.load_map()?;
        Ok(map.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.locked_modify(|map| {
            map.insert(key.to_string(), value);
            Ok(())
        })?;
        tracing::debug!("Saved key '{}' to {:?}", key, self.path);
        Ok(())
    }

    fn update(&self, key: &str, f: UpdateFn<'_>) -> Result<()> {
        self.locked_modify(|map| {
            let updated = f(map.remove(key))?;
            map.insert(key.to_string(), updated);
            Ok(())
        })?;
        tracing::debug!("Updated key '{}' in {:?}", key, self.path);
        Ok(())
    }
}

/// In-memory store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn update(&self, key: &str, f: UpdateFn<'_>) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".into()))?;
        let updated = f(entries.get(key).cloned())?;
        entries.insert(key.to_string(), updated);
        Ok(())
    }
}
