//! Configuration management for DevParts
//!
//! Handles the daemon configuration (sysfs paths, TV-out driver, polling) and
//! the persisted user settings that the control panel re-applies at boot.
//! TOML files are layered: a system file first, then a user file on top.

mod control_paths;
mod service_config;
mod settings_store;

pub use control_paths::ControlPathsConfig;
pub use service_config::{DaemonConfig, ScreenProbeConfig, TvOutConfig};
pub use settings_store::SettingsStore;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/devparts";
pub const USER_CONFIG_DIR: &str = "/data/devparts";
pub const CONFIG_FILE: &str = "config.toml";

/// Main DevParts configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevPartsConfig {
    #[serde(default)]
    pub controls: ControlPathsConfig,

    #[serde(default)]
    pub tvout: TvOutConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl DevPartsConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_layered(&[
            Path::new(CONFIG_DIR).join(CONFIG_FILE),
            Path::new(USER_CONFIG_DIR).join(CONFIG_FILE),
        ])
    }

    /// Load and merge every existing file, later files overriding earlier ones
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut found = false;

        for path in paths {
            if !path.exists() {
                continue;
            }

            let contents = std::fs::read_to_string(path)?;
            let layer: toml::Value = toml::from_str(&contents)?;
            merge_toml(&mut merged, layer);
            found = true;
            tracing::debug!("Loaded configuration layer {}", path.display());
        }

        if !found {
            // Return default config if no file exists
            tracing::warn!("No configuration file found, using defaults");
            return Ok(Self::default());
        }

        let config: Self = merged.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "daemon.poll_interval_ms must be greater than 0".into(),
            ));
        }

        if self.tvout.enabled && self.tvout.library_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "tvout.library_path is required when TV-out is enabled".into(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Helper function to merge TOML values
pub fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = DevPartsConfig::default();
        assert!(config.daemon.poll_interval_ms > 0);
        assert!(config.tvout.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = DevPartsConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: DevPartsConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.daemon.poll_interval_ms, parsed.daemon.poll_interval_ms);
        assert_eq!(config.controls.touchkey_timeout, parsed.controls.touchkey_timeout);
        assert_eq!(config.tvout.library_path, parsed.tvout.library_path);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/devparts/config.toml"));
        assert!(format!("{}", err).contains("not found"));

        let err = ConfigError::Invalid("test error".to_string());
        assert!(format!("{}", err).contains("Invalid"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[controls]
touchkey_timeout = "/sys/devices/touchkey/led_timeout"

[tvout]
enabled = false

[daemon]
poll_interval_ms = 250
"#;
        write!(temp_file, "{}", config_content).unwrap();

        let config = DevPartsConfig::load(temp_file.path()).unwrap();
        assert_eq!(
            config.controls.touchkey_timeout,
            PathBuf::from("/sys/devices/touchkey/led_timeout")
        );
        assert!(!config.tvout.enabled);
        assert_eq!(config.daemon.poll_interval_ms, 250);
        // Unspecified fields keep their defaults
        assert_eq!(
            config.controls.gyro_calibration,
            PathBuf::from("/sys/class/sec/gsensorcal/calibration")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = DevPartsConfig::load(&dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_zero_interval() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[daemon]\npoll_interval_ms = 0\n").unwrap();

        let err = DevPartsConfig::load(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_layered_overrides() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system.toml");
        let user = dir.path().join("user.toml");

        std::fs::write(
            &system,
            "[daemon]\npoll_interval_ms = 1000\nlog_level = \"debug\"\n",
        )
        .unwrap();
        std::fs::write(&user, "[daemon]\npoll_interval_ms = 200\n").unwrap();

        let config = DevPartsConfig::load_layered(&[system, user]).unwrap();
        assert_eq!(config.daemon.poll_interval_ms, 200);
        assert_eq!(config.daemon.log_level, "debug");
    }

    #[test]
    fn test_load_layered_without_files() {
        let dir = TempDir::new().unwrap();
        let config = DevPartsConfig::load_layered(&[dir.path().join("none.toml")]).unwrap();
        assert_eq!(config.daemon.poll_interval_ms, DaemonConfig::default().poll_interval_ms);
    }

    #[test]
    fn test_save_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = DevPartsConfig::default();
        config.daemon.poll_interval_ms = 750;

        config.save(&path).unwrap();

        let loaded = DevPartsConfig::load(&path).unwrap();
        assert_eq!(loaded.daemon.poll_interval_ms, 750);
    }

    #[test]
    fn test_merge_toml_tables() {
        let base_table = toml::toml! {
            [daemon]
            poll_interval_ms = 500
            log_level = "info"
        };
        let mut base = toml::Value::Table(base_table);

        let overlay_table = toml::toml! {
            [daemon]
            log_level = "trace"
        };
        let overlay = toml::Value::Table(overlay_table);

        merge_toml(&mut base, overlay);

        let table = base.as_table().unwrap();
        let daemon = table.get("daemon").unwrap().as_table().unwrap();
        assert_eq!(daemon.get("poll_interval_ms").unwrap().as_integer(), Some(500));
        assert_eq!(daemon.get("log_level").unwrap().as_str(), Some("trace"));
    }

    #[test]
    fn test_merge_toml_replaces_non_tables() {
        let mut base = toml::Value::Integer(42);
        let overlay = toml::Value::Integer(100);

        merge_toml(&mut base, overlay);

        assert_eq!(base.as_integer(), Some(100));
    }

    #[test]
    fn test_constants() {
        assert_eq!(CONFIG_DIR, "/etc/devparts");
        assert_eq!(USER_CONFIG_DIR, "/data/devparts");
    }
}
