//! Backup configuration management.
//!
//! `BackupConfig` owns the in-memory configuration (source locations,
//! destination, overwrite flag), validates every mutation, and persists
//! write-through: after any successful mutation the store file exactly
//! reflects memory.
//!
//! Paths are kept as the exact strings the caller supplied; `./x` and
//! `x/` are distinct entries. The UI layer is expected to hand over
//! absolute paths from a directory picker.

use std::path::Path;

use crate::error::EngineError;
use crate::model::BackupSnapshot;
use crate::store::JsonStore;

/// Store key for the ordered list of source locations.
pub const LOCATIONS_KEY: &str = "LOC";
/// Store key for the destination directory.
pub const DESTINATION_KEY: &str = "DES";
/// Store key for the overwrite flag.
pub const OVERWRITE_KEY: &str = "OVR";

/// The persistent backup configuration.
#[derive(Debug)]
pub struct BackupConfig {
    store: JsonStore,
    locations: Vec<String>,
    destination: String,
    overwrite: bool,
}

impl BackupConfig {
    /// Load the configuration from the store at `store_path`, creating
    /// an empty one on first run.
    pub fn open<P: AsRef<Path>>(store_path: P) -> Result<Self, EngineError> {
        Self::with_overrides(store_path, None, None, None)
    }

    /// Load the configuration, with any explicitly supplied field taking
    /// precedence over the stored value.
    pub fn with_overrides<P: AsRef<Path>>(
        store_path: P,
        locations: Option<Vec<String>>,
        destination: Option<String>,
        overwrite: Option<bool>,
    ) -> Result<Self, EngineError> {
        let store = JsonStore::open(store_path)?;

        let locations =
            locations.unwrap_or_else(|| store.get(LOCATIONS_KEY).unwrap_or_default());
        let destination =
            destination.unwrap_or_else(|| store.get(DESTINATION_KEY).unwrap_or_default());
        let overwrite = overwrite.unwrap_or_else(|| store.get(OVERWRITE_KEY).unwrap_or(true));

        Ok(BackupConfig {
            store,
            locations,
            destination,
            overwrite,
        })
    }

    /// Source directory roots, in configured order.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Destination root; empty string when not yet configured.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Whether conflicting destination entries are replaced.
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Append a source location.
    ///
    /// Returns `Ok(false)` without mutating when `path` does not name an
    /// existing directory or is already configured (exact string match).
    pub fn add_location(&mut self, path: &str) -> Result<bool, EngineError> {
        let p = Path::new(path);
        if !p.is_dir() {
            return Ok(false);
        }
        if self.locations.iter().any(|l| l == path) {
            return Ok(false);
        }

        self.locations.push(path.to_string());
        self.persist()?;
        Ok(true)
    }

    /// Remove a configured source location (exact string match).
    ///
    /// Unlike `JsonStore::delete`, removing an absent location is an
    /// error, not a silent no-op.
    pub fn remove_location(&mut self, path: &str) -> Result<(), EngineError> {
        let index = self
            .locations
            .iter()
            .position(|l| l == path)
            .ok_or_else(|| EngineError::LocationNotFound {
                path: path.to_string(),
            })?;

        self.locations.remove(index);
        self.persist()
    }

    /// Replace the destination root.
    ///
    /// Returns `Ok(false)` without mutating when `path` does not name an
    /// existing directory.
    pub fn set_destination(&mut self, path: &str) -> Result<bool, EngineError> {
        if !Path::new(path).is_dir() {
            return Ok(false);
        }

        self.destination = path.to_string();
        self.persist()?;
        Ok(true)
    }

    /// Set the overwrite flag. Always succeeds barring a store write
    /// failure.
    pub fn set_overwrite(&mut self, value: bool) -> Result<(), EngineError> {
        self.overwrite = value;
        self.persist()
    }

    /// Take an immutable snapshot for a backup session.
    pub fn snapshot(&self) -> BackupSnapshot {
        BackupSnapshot {
            locations: self.locations.clone(),
            destination: Path::new(&self.destination).to_path_buf(),
            overwrite: self.overwrite,
        }
    }

    // Write-through: all three fields go to the store together.
    fn persist(&mut self) -> Result<(), EngineError> {
        self.store.put_all([
            (LOCATIONS_KEY, serde_json::Value::from(self.locations.clone())),
            (DESTINATION_KEY, serde_json::Value::from(self.destination.clone())),
            (OVERWRITE_KEY, serde_json::Value::from(self.overwrite)),
        ]);
        self.store.save()
    }
}
