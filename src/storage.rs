// Durable key-value state for the countdown client, mirroring the PWA's
// localStorage keys: `target_time`, `enabled_map`, `settings`.
//
// Reads never fail: a missing or corrupt file (or key) falls back to the
// documented defaults. Only writes surface errors.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::models::{Settings, TargetTime};
use crate::schedule::EnabledMap;

pub const KEY_TARGET_TIME: &str = "target_time";
pub const KEY_ENABLED_MAP: &str = "enabled_map";
pub const KEY_SETTINGS: &str = "settings";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to write client state: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode client state: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct ClientStore {
    path: PathBuf,
    values: HashMap<String, Value>,
}

impl ClientStore {
    /// Open the store at `path`, falling back to an empty map when the file
    /// is absent or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> ClientStore {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(values) => values,
                Err(e) => {
                    error!("Corrupt client state at {:?}, using defaults: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        ClientStore { path, values }
    }

    fn get<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.values.get(key) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Unreadable value for key '{}', using default: {}", key, e);
                    T::default()
                }
            },
            None => T::default(),
        }
    }

    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        self.values
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.flush()
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.values)?)?;
        Ok(())
    }

    /// Stored target time, or 19:00:00 when absent.
    pub fn target_time(&self) -> TargetTime {
        self.get(KEY_TARGET_TIME)
    }

    pub fn set_target_time(&mut self, target: &TargetTime) -> Result<(), StorageError> {
        self.set(KEY_TARGET_TIME, target)
    }

    pub fn enabled_map(&self) -> EnabledMap {
        self.get(KEY_ENABLED_MAP)
    }

    pub fn set_enabled_map(&mut self, map: &EnabledMap) -> Result<(), StorageError> {
        self.set(KEY_ENABLED_MAP, map)
    }

    pub fn settings(&self) -> Settings {
        self.get(KEY_SETTINGS)
    }

    pub fn set_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.set(KEY_SETTINGS, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let store = ClientStore::open(dir.path().join("state.json"));

        assert_eq!(store.target_time(), TargetTime::default());
        assert_eq!(store.target_time().seconds(), 68400); // 19:00:00
        assert!(store.enabled_map().is_empty());
        assert_eq!(store.settings(), Settings::default());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let store = ClientStore::open(&path);
        assert_eq!(store.target_time(), TargetTime::default());
    }

    #[test]
    fn target_time_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let target = TargetTime { hour: 8, minute: 0, second: 0 };
        {
            let mut store = ClientStore::open(&path);
            store.set_target_time(&target).unwrap();
        }

        let reloaded = ClientStore::open(&path);
        assert_eq!(reloaded.target_time(), target);
        assert_eq!(
            crate::schedule::derive_schedules(&reloaded.target_time()),
            crate::schedule::derive_schedules(&target)
        );
    }

    #[test]
    fn keys_are_independent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = ClientStore::open(&path);
        let mut map = EnabledMap::new();
        map.insert("28800".to_string(), false);
        store.set_enabled_map(&map).unwrap();

        let reloaded = ClientStore::open(&path);
        assert_eq!(reloaded.enabled_map().get("28800"), Some(&false));
        // untouched keys keep their defaults
        assert_eq!(reloaded.target_time(), TargetTime::default());
        assert_eq!(reloaded.settings().theme, "dark");
    }
}
