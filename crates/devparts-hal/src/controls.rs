//! Hardware control points
//!
//! A control point is one user-facing knob backed by one or more sysfs
//! pseudo-files. Control points hold no state of their own: the current value
//! lives in the kernel driver and in the persisted settings, and every
//! operation takes the [`SysfsChannel`] it should talk through.

use crate::HalError;
use crate::sysfs::SysfsChannel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies a control point and its driver-specific behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlId {
    GyroCalibration,
    TouchkeyLight,
    TouchkeyTimeout,
    TouchscreenSensitivity,
    MdnieScenario,
    MdnieMode,
    MdnieNegative,
    MdnieOutdoor,
    PanelGamma,
}

const TOUCHKEY_TIMEOUT_ENTRIES: &[(&str, &str)] = &[
    ("0", "Never"),
    ("1", "1 second"),
    ("2", "2 seconds"),
    ("3", "3 seconds"),
    ("5", "5 seconds"),
    ("10", "10 seconds"),
];

const TOUCHSCREEN_SENSITIVITY_ENTRIES: &[(&str, &str)] = &[
    ("30", "Very high"),
    ("40", "High"),
    ("50", "Normal"),
    ("60", "Low"),
    ("70", "Very low"),
];

const MDNIE_SCENARIO_ENTRIES: &[(&str, &str)] = &[
    ("0", "UI"),
    ("1", "Video"),
    ("2", "Video warm"),
    ("3", "Video cold"),
    ("4", "Camera"),
    ("5", "Navigation"),
    ("6", "Gallery"),
];

const MDNIE_MODE_ENTRIES: &[(&str, &str)] = &[
    ("0", "Dynamic"),
    ("1", "Standard"),
    ("2", "Natural"),
    ("3", "Movie"),
];

const PANEL_GAMMA_ENTRIES: &[(&str, &str)] = &[("0", "2.2"), ("1", "1.9")];

impl ControlId {
    /// Settings key, also used as the persisted preference key
    pub fn key(&self) -> &'static str {
        match self {
            ControlId::GyroCalibration => "use_gyro_calibration",
            ControlId::TouchkeyLight => "touchkey_light",
            ControlId::TouchkeyTimeout => "touchkey_timeout",
            ControlId::TouchscreenSensitivity => "touchscreen_sensitivity",
            ControlId::MdnieScenario => "mdnie_scenario",
            ControlId::MdnieMode => "mdnie_mode",
            ControlId::MdnieNegative => "mdnie_negative",
            ControlId::MdnieOutdoor => "mdnie_outdoor",
            ControlId::PanelGamma => "panel_gamma",
        }
    }

    /// Human readable title
    pub fn title(&self) -> &'static str {
        match self {
            ControlId::GyroCalibration => "Use gyroscope calibration",
            ControlId::TouchkeyLight => "Touchkey backlight",
            ControlId::TouchkeyTimeout => "Touchkey backlight timeout",
            ControlId::TouchscreenSensitivity => "Touchscreen sensitivity",
            ControlId::MdnieScenario => "mDNIe scenario",
            ControlId::MdnieMode => "mDNIe mode",
            ControlId::MdnieNegative => "mDNIe negative mode",
            ControlId::MdnieOutdoor => "mDNIe outdoor mode",
            ControlId::PanelGamma => "Panel gamma",
        }
    }

    /// Widget kind and default value
    pub fn kind(&self) -> ControlKind {
        match self {
            ControlId::GyroCalibration => ControlKind::Toggle { default: true },
            ControlId::TouchkeyLight => ControlKind::Toggle { default: true },
            ControlId::TouchkeyTimeout => ControlKind::Choice {
                default: "3",
                entries: TOUCHKEY_TIMEOUT_ENTRIES,
            },
            ControlId::TouchscreenSensitivity => ControlKind::Choice {
                default: "50",
                entries: TOUCHSCREEN_SENSITIVITY_ENTRIES,
            },
            ControlId::MdnieScenario => ControlKind::Choice {
                default: "0",
                entries: MDNIE_SCENARIO_ENTRIES,
            },
            ControlId::MdnieMode => ControlKind::Choice {
                default: "0",
                entries: MDNIE_MODE_ENTRIES,
            },
            ControlId::MdnieNegative | ControlId::MdnieOutdoor => {
                ControlKind::Toggle { default: false }
            }
            ControlId::PanelGamma => ControlKind::Choice {
                default: "0",
                entries: PANEL_GAMMA_ENTRIES,
            },
        }
    }

    /// Stock sysfs paths on the reference kernel
    pub fn default_paths(&self) -> Vec<PathBuf> {
        let paths: &[&str] = match self {
            ControlId::GyroCalibration => &["/sys/class/sec/gsensorcal/calibration"],
            ControlId::TouchkeyLight => &[
                "/sys/class/sec/sec_touchkey/force_disable",
                "/sys/class/sec/sec_touchkey/brightness",
            ],
            ControlId::TouchkeyTimeout => &["/sys/class/sec/sec_touchkey/led_timeout"],
            ControlId::TouchscreenSensitivity => &["/sys/class/sec/sec_touchscreen/tsp_threshold"],
            ControlId::MdnieScenario => &["/sys/class/mdnie/mdnie/scenario"],
            ControlId::MdnieMode => &["/sys/class/mdnie/mdnie/mode"],
            ControlId::MdnieNegative => &["/sys/class/mdnie/mdnie/negative"],
            ControlId::MdnieOutdoor => &["/sys/class/mdnie/mdnie/outdoor"],
            ControlId::PanelGamma => &["/sys/class/lcd/panel/gamma_mode"],
        };
        paths.iter().map(PathBuf::from).collect()
    }

    /// Look up a control by its settings key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|id| id.key() == key)
    }

    /// All control points in panel order
    pub fn all() -> &'static [ControlId] {
        &[
            ControlId::GyroCalibration,
            ControlId::TouchkeyLight,
            ControlId::TouchkeyTimeout,
            ControlId::TouchscreenSensitivity,
            ControlId::MdnieScenario,
            ControlId::MdnieMode,
            ControlId::MdnieNegative,
            ControlId::MdnieOutdoor,
            ControlId::PanelGamma,
        ]
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// UI widget kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Checkbox
    Toggle { default: bool },
    /// List of `(token, label)` entries
    Choice {
        default: &'static str,
        entries: &'static [(&'static str, &'static str)],
    },
}

impl ControlKind {
    /// Value used when nothing has been persisted yet
    pub fn default_value(&self) -> ControlValue {
        match self {
            ControlKind::Toggle { default } => ControlValue::Toggle(*default),
            ControlKind::Choice { default, .. } => ControlValue::Choice((*default).to_string()),
        }
    }
}

/// A control point value as the UI holds it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Toggle(bool),
    Choice(String),
}

impl ControlValue {
    /// Driver token for single-file controls
    pub fn token(&self) -> &str {
        match self {
            ControlValue::Toggle(true) => "1",
            ControlValue::Toggle(false) => "0",
            ControlValue::Choice(token) => token,
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Toggle(on) => write!(f, "{}", if *on { "on" } else { "off" }),
            ControlValue::Choice(token) => f.write_str(token),
        }
    }
}

/// One pending pseudo-file write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsWrite {
    pub path: PathBuf,
    pub token: String,
}

impl SysfsWrite {
    fn new(path: &Path, token: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            token: token.to_string(),
        }
    }
}

/// A control point bound to its sysfs paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPoint {
    id: ControlId,
    paths: Vec<PathBuf>,
}

impl ControlPoint {
    /// Bind a control to explicit paths.
    ///
    /// The touchkey light takes two paths, `force_disable` then `brightness`;
    /// every other control takes one.
    pub fn new(id: ControlId, paths: Vec<PathBuf>) -> Self {
        Self { id, paths }
    }

    /// Bind a control to the stock kernel paths
    pub fn with_default_paths(id: ControlId) -> Self {
        Self::new(id, id.default_paths())
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn key(&self) -> &'static str {
        self.id.key()
    }

    pub fn kind(&self) -> ControlKind {
        self.id.kind()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// True iff every backing pseudo-file exists
    pub fn is_supported(&self, channel: &dyn SysfsChannel) -> bool {
        let supported = !self.paths.is_empty() && self.paths.iter().all(|p| channel.exists(p));
        if !supported {
            tracing::debug!("{} not supported on this kernel", self.id);
        }
        supported
    }

    /// Parse raw user input under the widget's constraints
    pub fn parse(&self, raw: &str) -> Result<ControlValue, HalError> {
        let raw = raw.trim();
        match self.kind() {
            ControlKind::Toggle { .. } => match raw.to_lowercase().as_str() {
                "1" | "true" | "on" => Ok(ControlValue::Toggle(true)),
                "0" | "false" | "off" => Ok(ControlValue::Toggle(false)),
                _ => Err(HalError::InvalidValue {
                    key: self.key(),
                    value: raw.to_string(),
                    expected: "on, off".into(),
                }),
            },
            ControlKind::Choice { entries, .. } => {
                if entries.iter().any(|(token, _)| *token == raw) {
                    Ok(ControlValue::Choice(raw.to_string()))
                } else {
                    Err(HalError::InvalidValue {
                        key: self.key(),
                        value: raw.to_string(),
                        expected: entries
                            .iter()
                            .map(|(token, _)| *token)
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
                }
            }
        }
    }

    /// Writes performed when the user changes the value
    pub fn change_writes(&self, value: &ControlValue) -> Vec<SysfsWrite> {
        match (self.id, value) {
            (ControlId::TouchkeyLight, ControlValue::Toggle(on)) => {
                let (disable, brightness) = if *on { ("0", "1") } else { ("1", "2") };
                self.touchkey_writes(disable, brightness, false)
            }
            _ => self.single_write(value.token()),
        }
    }

    /// Writes that re-apply a persisted value at boot
    pub fn restore_writes(&self, persisted: Option<&ControlValue>) -> Vec<SysfsWrite> {
        let value = persisted
            .cloned()
            .unwrap_or_else(|| self.kind().default_value());

        match (self.id, &value) {
            // The driver boots with calibration enabled and recalibrates when
            // it is written as enabled, so only the disabled state is replayed.
            (ControlId::GyroCalibration, ControlValue::Toggle(true)) => Vec::new(),
            (ControlId::TouchkeyLight, ControlValue::Toggle(on)) => {
                let (disable, brightness) = if *on { ("0", "1") } else { ("1", "0") };
                self.touchkey_writes(disable, brightness, true)
            }
            _ => self.single_write(value.token()),
        }
    }

    /// Perform writes through the channel.
    ///
    /// Failures are logged and skipped; returns how many writes succeeded.
    pub fn apply(&self, channel: &dyn SysfsChannel, writes: &[SysfsWrite]) -> usize {
        let mut applied = 0;
        for write in writes {
            match channel.write(&write.path, &write.token) {
                Ok(()) => {
                    tracing::debug!("{}: {} <- {}", self.id, write.path.display(), write.token);
                    applied += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "{}: failed to write {} to {}: {}",
                        self.id,
                        write.token,
                        write.path.display(),
                        e
                    );
                }
            }
        }
        applied
    }

    fn single_write(&self, token: &str) -> Vec<SysfsWrite> {
        self.paths
            .first()
            .map(|path| vec![SysfsWrite::new(path, token)])
            .unwrap_or_default()
    }

    fn touchkey_writes(
        &self,
        disable: &str,
        brightness: &str,
        brightness_first: bool,
    ) -> Vec<SysfsWrite> {
        let (Some(disable_path), Some(brightness_path)) = (self.paths.first(), self.paths.get(1))
        else {
            tracing::warn!("{} needs force_disable and brightness paths", self.id);
            return Vec::new();
        };

        let disable = SysfsWrite::new(disable_path, disable);
        let brightness = SysfsWrite::new(brightness_path, brightness);
        if brightness_first {
            vec![brightness, disable]
        } else {
            vec![disable, brightness]
        }
    }
}

/// Every control point bound to the stock kernel paths
pub fn default_control_points() -> Vec<ControlPoint> {
    ControlId::all()
        .iter()
        .map(|id| ControlPoint::with_default_paths(*id))
        .collect()
}
