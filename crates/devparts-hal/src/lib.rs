//! Hardware Abstraction Layer (HAL)
//!
//! This crate exposes the device-specific knobs of Galaxy S2 class handsets:
//! kernel driver toggles reached through sysfs (gyroscope calibration, touchkey
//! backlight, touchscreen sensitivity, mDNIe colour presets) and the vendor
//! TV-out driver that streams the screen over HDMI.
//!
//! # Example
//!
//! ```no_run
//! use devparts_hal::{FsChannel, SettingsPanel, default_control_points};
//! use devparts_hal::mock::MemoryPreferences;
//!
//! let panel = SettingsPanel::new(FsChannel::new(), default_control_points());
//! let mut prefs = MemoryPreferences::new();
//!
//! // Re-apply persisted values at boot
//! let applied = panel.restore(&prefs);
//! println!("Restored {} control points", applied);
//!
//! // Change a control the way the settings UI would
//! panel.change(&mut prefs, "touchkey_timeout", "5").unwrap();
//! ```

pub mod controls;
pub mod mock;
pub mod native;
pub mod panel;
pub mod sysfs;
pub mod tvout;
pub mod watcher;

pub use controls::{
    ControlId, ControlKind, ControlPoint, ControlValue, SysfsWrite, default_control_points,
};
pub use native::{NativeTvOut, NativeTvOutFactory};
pub use panel::{ChangeOutcome, ControlEntry, PrefValue, PreferenceStore, SettingsPanel};
pub use sysfs::{FsChannel, SysfsChannel};
pub use tvout::{
    DriverAction, DriverFactory, DriverStatus, PlatformSignal, Transition, TvOutController,
    TvOutDriver, TvOutSessionState,
};
pub use watcher::{ScreenProbe, ScreenProbeKind, SignalWatcher};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HalError {
    #[error("Unknown control: {0}")]
    UnknownControl(String),

    #[error("Control is disabled: {0}")]
    ControlDisabled(String),

    #[error("Invalid value {value:?} for {key} (expected one of: {expected})")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: String,
    },

    #[error("TV-out driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("Failed to load driver library: {0}")]
    Library(#[from] libloading::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HAL Result type
pub type Result<T> = std::result::Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hal_error_display() {
        let err = HalError::UnknownControl("vibration".into());
        assert!(format!("{}", err).contains("vibration"));

        let err = HalError::InvalidValue {
            key: "touchkey_timeout",
            value: "7".into(),
            expected: "0, 1".into(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("touchkey_timeout"));
        assert!(msg.contains("\"7\""));
    }
}
