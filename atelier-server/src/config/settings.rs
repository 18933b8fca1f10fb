//! Persisted settings record
//!
//! A flat JSON object of operator credentials and tool install paths. The
//! record is loaded by merging the file over built-in defaults, and saved by
//! merging an update into the current record and writing it back whole.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use atelier_utils::{AtelierError, Result};

/// Configured Photoshop install path
pub const PHOTOSHOP_PATH_KEY: &str = "photoshopPath";
/// Configured Premiere Pro install path
pub const PREMIERE_PATH_KEY: &str = "premierePath";
/// Configured After Effects install path
pub const AFTER_EFFECTS_PATH_KEY: &str = "afterEffectsPath";

const DEFAULT_KEYS: &[&str] = &["adminId", "adminPw", "figmaPat", "figmaFileKey"];

/// Settings record backed by a JSON file
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    record: RwLock<Map<String, Value>>,
}

impl SettingsStore {
    /// Built-in defaults every record starts from
    pub fn defaults() -> Map<String, Value> {
        DEFAULT_KEYS
            .iter()
            .map(|key| (key.to_string(), Value::String(String::new())))
            .collect()
    }

    /// Load the record at `path`
    ///
    /// A missing or unreadable file yields the defaults; the store still
    /// saves to `path` afterwards.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut record = Self::defaults();

        match Self::read_file(&path) {
            Ok(Some(stored)) => {
                debug!("Loaded settings from {}", path.display());
                record.extend(stored);
            }
            Ok(None) => debug!("No settings file at {}, using defaults", path.display()),
            Err(e) => warn!("Ignoring settings file: {}", e),
        }

        Self {
            path,
            record: RwLock::new(record),
        }
    }

    fn read_file(path: &Path) -> Result<Option<Map<String, Value>>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AtelierError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(AtelierError::ConfigInvalid {
                path: path.to_path_buf(),
                message: "settings record must be a JSON object".into(),
            }),
        }
    }

    /// File this store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// String value of `key`, `None` when absent, not a string, or empty
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.record
            .read()
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    }

    /// Copy of the current record
    pub fn snapshot(&self) -> Map<String, Value> {
        self.record.read().clone()
    }

    /// Merge `update` into the record and persist it
    ///
    /// The in-memory record only changes once the file has been written.
    pub fn merge_and_save(&self, update: &Map<String, Value>) -> Result<()> {
        let mut record = self.record.write();

        let mut merged = record.clone();
        for (key, value) in update {
            merged.insert(key.clone(), value.clone());
        }

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| AtelierError::FileWrite {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(merged.clone()))?;
        std::fs::write(&self.path, content).map_err(|e| AtelierError::FileWrite {
            path: self.path.clone(),
            source: e,
        })?;

        *record = merged;
        debug!("Saved {} settings to {}", update.len(), self.path.display());
        Ok(())
    }
}
