//! Persistent key-value store.
//!
//! A single JSON file holding a flat object of string keys to arbitrary
//! JSON values. Mutations (`put`, `put_all`, `delete`) touch memory only;
//! `save` commits the whole map to disk and `load` replaces memory from
//! disk. A missing or corrupt file is treated as an empty store and
//! re-persisted immediately, so the file is always valid after `open`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::EngineError;

/// A durable string-keyed JSON store backed by a single file.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    data: Map<String, Value>,
}

impl JsonStore {
    /// Open a store at `path`, creating parent directories and loading
    /// existing content. A missing or unreadable-as-JSON file results in
    /// an empty store that is persisted straight away.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| EngineError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut store = JsonStore {
            path,
            data: Map::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch a value by key, deserialized into `T`.
    ///
    /// Returns `None` if the key is absent or the stored value does not
    /// deserialize as `T`; callers supply their own default.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Upsert a key-value pair in memory. Does not write to disk.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Upsert every pair in `entries`. Does not write to disk.
    pub fn put_all<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.data.insert(key.into(), value.into());
        }
    }

    /// Remove a key from memory; a no-op if the key is absent.
    pub fn delete(&mut self, key: &str) {
        self.data.remove(key);
    }

    /// Serialize the full in-memory map to the backing file, replacing
    /// its previous content.
    ///
    /// Writes go through a sibling temp file followed by a rename so a
    /// crash mid-write cannot leave a truncated store behind.
    pub fn save(&self) -> Result<(), EngineError> {
        let serialized = serde_json::to_vec(&self.data).map_err(|e| EngineError::StoreWrite {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized).map_err(|e| EngineError::StoreWrite {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| EngineError::StoreWrite {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }

    /// Replace the in-memory map with the backing file's content.
    ///
    /// A missing file (first run) or malformed content (corruption) both
    /// reset the store to empty and persist the empty map; neither case
    /// surfaces an error to the caller.
    pub fn load(&mut self) -> Result<(), EngineError> {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(data) => {
                    self.data = data;
                    Ok(())
                }
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "store file is corrupt, resetting to empty"
                    );
                    self.data = Map::new();
                    self.save()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no store file, creating empty store");
                self.data = Map::new();
                self.save()
            }
            Err(e) => Err(EngineError::StoreRead {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
