//! TV-out and daemon configuration

use devparts_hal::watcher::DEFAULT_HDMI_STATE_PATH;
use devparts_hal::{ScreenProbe, ScreenProbeKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Screen state file used to detect screen on/off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenProbeConfig {
    pub kind: ScreenProbeKind,
    pub path: PathBuf,
}

impl From<&ScreenProbeConfig> for ScreenProbe {
    fn from(config: &ScreenProbeConfig) -> Self {
        ScreenProbe::new(config.kind, config.path.clone())
    }
}

/// TV-out service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvOutConfig {
    /// Run the TV-out service in daemon mode
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// C shim library exposing the vendor driver
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,

    /// HDMI switch state file (1 = plugged)
    #[serde(default = "default_hdmi_state_path")]
    pub hdmi_state_path: PathBuf,

    /// Screen state file; detected automatically when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_probe: Option<ScreenProbeConfig>,
}

fn default_true() -> bool {
    true
}

fn default_library_path() -> PathBuf {
    PathBuf::from("/system/lib/libtvout_shim.so")
}

fn default_hdmi_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_HDMI_STATE_PATH)
}

impl Default for TvOutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            library_path: default_library_path(),
            hdmi_state_path: default_hdmi_state_path(),
            screen_probe: None,
        }
    }
}

/// Daemon behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// How often HDMI and screen state are polled
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Persisted control panel settings
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_poll_interval() -> u64 {
    500
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("/data/devparts/settings.toml")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            settings_path: default_settings_path(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tvout_defaults() {
        let config = TvOutConfig::default();
        assert!(config.enabled);
        assert_eq!(
            config.hdmi_state_path,
            PathBuf::from("/sys/devices/virtual/switch/hdmi/state")
        );
        assert!(config.screen_probe.is_none());
    }

    #[test]
    fn test_screen_probe_from_toml() {
        let config: TvOutConfig = toml::from_str(
            r#"
[screen_probe]
kind = "bl_power"
path = "/sys/class/backlight/s6e8aa0/bl_power"
"#,
        )
        .unwrap();

        let probe = ScreenProbe::from(config.screen_probe.as_ref().unwrap());
        assert_eq!(probe.kind, ScreenProbeKind::BlPower);
        assert_eq!(
            probe.path,
            PathBuf::from("/sys/class/backlight/s6e8aa0/bl_power")
        );
    }

    #[test]
    fn test_daemon_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.settings_path,
            PathBuf::from("/data/devparts/settings.toml")
        );
    }
}
