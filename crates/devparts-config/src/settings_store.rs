//! Persisted control panel settings
//!
//! Stored as a `[settings]` table of key -> bool/string, written back after
//! every change so the next boot can restore it.

use crate::ConfigError;
use devparts_hal::{PrefValue, PreferenceStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize)]
struct SettingsFile {
    settings: BTreeMap<String, PrefValue>,
}

/// On-disk form as read back; entries are checked one by one
#[derive(Debug, Default, Deserialize)]
struct RawSettingsFile {
    #[serde(default)]
    settings: BTreeMap<String, toml::Value>,
}

fn pref_from_toml(value: toml::Value) -> Option<PrefValue> {
    match value {
        toml::Value::Boolean(on) => Some(PrefValue::Bool(on)),
        toml::Value::String(text) => Some(PrefValue::Text(text)),
        toml::Value::Integer(n) => Some(PrefValue::Text(n.to_string())),
        _ => None,
    }
}

/// File-backed preference store
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, PrefValue>,
}

impl SettingsStore {
    /// Open the store; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: RawSettingsFile = toml::from_str(&contents)?;

            let mut values = BTreeMap::new();
            for (key, value) in file.settings {
                match pref_from_toml(value) {
                    Some(pref) => {
                        values.insert(key, pref);
                    }
                    None => tracing::warn!("Ignoring unreadable setting {}", key),
                }
            }

            tracing::debug!("Loaded {} settings from {}", values.len(), path.display());
            values
        } else {
            tracing::debug!("No settings at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write the store back to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let file = SettingsFile {
            settings: self.values.clone(),
        };
        let contents = toml::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, contents)?;
        tracing::debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

impl PreferenceStore for SettingsStore {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: PrefValue) {
        self.values.insert(key.to_string(), value);
    }
}
