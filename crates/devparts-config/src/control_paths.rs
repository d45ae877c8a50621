//! Sysfs paths for every control point
//!
//! Kernels for the same handset do not always agree on attribute locations,
//! so each path can be overridden in `[controls]`.

use devparts_hal::{ControlId, ControlPoint};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path overrides for the hardware control points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPathsConfig {
    /// Resolve every device path below this directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sysfs_root: Option<PathBuf>,
    pub gyro_calibration: PathBuf,
    pub touchkey_force_disable: PathBuf,
    pub touchkey_brightness: PathBuf,
    pub touchkey_timeout: PathBuf,
    pub touchscreen_sensitivity: PathBuf,
    pub mdnie_scenario: PathBuf,
    pub mdnie_mode: PathBuf,
    pub mdnie_negative: PathBuf,
    pub mdnie_outdoor: PathBuf,
    pub panel_gamma: PathBuf,
}

fn stock_path(id: ControlId, index: usize) -> PathBuf {
    id.default_paths().swap_remove(index)
}

impl Default for ControlPathsConfig {
    fn default() -> Self {
        Self {
            sysfs_root: None,
            gyro_calibration: stock_path(ControlId::GyroCalibration, 0),
            touchkey_force_disable: stock_path(ControlId::TouchkeyLight, 0),
            touchkey_brightness: stock_path(ControlId::TouchkeyLight, 1),
            touchkey_timeout: stock_path(ControlId::TouchkeyTimeout, 0),
            touchscreen_sensitivity: stock_path(ControlId::TouchscreenSensitivity, 0),
            mdnie_scenario: stock_path(ControlId::MdnieScenario, 0),
            mdnie_mode: stock_path(ControlId::MdnieMode, 0),
            mdnie_negative: stock_path(ControlId::MdnieNegative, 0),
            mdnie_outdoor: stock_path(ControlId::MdnieOutdoor, 0),
            panel_gamma: stock_path(ControlId::PanelGamma, 0),
        }
    }
}

impl ControlPathsConfig {
    /// Paths backing one control point
    pub fn paths_for(&self, id: ControlId) -> Vec<PathBuf> {
        match id {
            ControlId::GyroCalibration => vec![self.gyro_calibration.clone()],
            ControlId::TouchkeyLight => vec![
                self.touchkey_force_disable.clone(),
                self.touchkey_brightness.clone(),
            ],
            ControlId::TouchkeyTimeout => vec![self.touchkey_timeout.clone()],
            ControlId::TouchscreenSensitivity => vec![self.touchscreen_sensitivity.clone()],
            ControlId::MdnieScenario => vec![self.mdnie_scenario.clone()],
            ControlId::MdnieMode => vec![self.mdnie_mode.clone()],
            ControlId::MdnieNegative => vec![self.mdnie_negative.clone()],
            ControlId::MdnieOutdoor => vec![self.mdnie_outdoor.clone()],
            ControlId::PanelGamma => vec![self.panel_gamma.clone()],
        }
    }

    /// Build the control points in panel order
    pub fn control_points(&self) -> Vec<ControlPoint> {
        ControlId::all()
            .iter()
            .map(|id| ControlPoint::new(*id, self.paths_for(*id)))
            .collect()
    }
}
