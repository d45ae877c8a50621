//! Device settings panel
//!
//! Mediates between the settings UI, the persisted preferences and the
//! control points. The panel owns the sysfs channel; preferences are passed in
//! so the same panel can serve the CLI, the boot-time restore and tests.

use crate::HalError;
use crate::controls::{ControlId, ControlKind, ControlPoint, ControlValue};
use crate::sysfs::SysfsChannel;
use serde::{Deserialize, Serialize};

/// A persisted preference value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Text(String),
}

impl From<&ControlValue> for PrefValue {
    fn from(value: &ControlValue) -> Self {
        match value {
            ControlValue::Toggle(on) => PrefValue::Bool(*on),
            ControlValue::Choice(token) => PrefValue::Text(token.clone()),
        }
    }
}

/// Key/value store holding the user's settings across reboots
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<PrefValue>;
    fn put(&mut self, key: &str, value: PrefValue);
}

/// One row of the settings screen
#[derive(Debug, Clone, Serialize)]
pub struct ControlEntry {
    pub id: ControlId,
    pub key: &'static str,
    pub title: &'static str,
    pub supported: bool,
    pub enabled: bool,
    pub value: ControlValue,
    /// Valid tokens for list controls, empty for toggles
    pub choices: Vec<&'static str>,
}

/// Result of a user change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOutcome {
    pub value: ControlValue,
    /// Pseudo-file writes that succeeded
    pub written: usize,
    /// Dependent controls whose enabled state follows this change
    pub dependents: Vec<(ControlId, bool)>,
}

/// The settings panel
pub struct SettingsPanel<C: SysfsChannel> {
    channel: C,
    controls: Vec<ControlPoint>,
}

impl<C: SysfsChannel> SettingsPanel<C> {
    pub fn new(channel: C, controls: Vec<ControlPoint>) -> Self {
        Self { channel, controls }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Find a control by settings key
    pub fn control(&self, key: &str) -> Option<&ControlPoint> {
        self.controls.iter().find(|c| c.key() == key)
    }

    fn control_by_id(&self, id: ControlId) -> Option<&ControlPoint> {
        self.controls.iter().find(|c| c.id() == id)
    }

    /// Persisted value, if one exists and fits the control's widget kind
    fn persisted_value(
        &self,
        control: &ControlPoint,
        store: &dyn PreferenceStore,
    ) -> Option<ControlValue> {
        let pref = store.get(control.key())?;
        match (control.kind(), pref) {
            (ControlKind::Toggle { .. }, PrefValue::Bool(on)) => Some(ControlValue::Toggle(on)),
            (ControlKind::Toggle { .. }, PrefValue::Text(text)) => control.parse(&text).ok(),
            (ControlKind::Choice { .. }, PrefValue::Text(token)) => {
                Some(ControlValue::Choice(token))
            }
            (ControlKind::Choice { .. }, PrefValue::Bool(_)) => {
                tracing::warn!("Ignoring boolean preference for list control {}", control.id());
                None
            }
        }
    }

    /// Persisted value or the control's default
    pub fn current_value(
        &self,
        control: &ControlPoint,
        store: &dyn PreferenceStore,
    ) -> ControlValue {
        self.persisted_value(control, store)
            .unwrap_or_else(|| control.kind().default_value())
    }

    fn touchkey_light_on(&self, store: &dyn PreferenceStore) -> bool {
        let light = self
            .control_by_id(ControlId::TouchkeyLight)
            .map(|c| self.current_value(c, store));
        !matches!(light, Some(ControlValue::Toggle(false)))
    }

    /// Whether the UI should let the user change this control
    pub fn is_enabled(&self, control: &ControlPoint, store: &dyn PreferenceStore) -> bool {
        if !control.is_supported(&self.channel) {
            return false;
        }

        match control.id() {
            ControlId::TouchkeyTimeout => self.touchkey_light_on(store),
            _ => true,
        }
    }

    /// Rows for the settings screen
    pub fn entries(&self, store: &dyn PreferenceStore) -> Vec<ControlEntry> {
        self.controls
            .iter()
            .map(|control| {
                let choices = match control.kind() {
                    ControlKind::Choice { entries, .. } => {
                        entries.iter().map(|(t, _)| *t).collect()
                    }
                    ControlKind::Toggle { .. } => Vec::new(),
                };

                ControlEntry {
                    id: control.id(),
                    key: control.key(),
                    title: control.id().title(),
                    supported: control.is_supported(&self.channel),
                    enabled: self.is_enabled(control, store),
                    value: self.current_value(control, store),
                    choices,
                }
            })
            .collect()
    }

    /// Apply a user change and persist it.
    ///
    /// Failed pseudo-file writes do not fail the change.
    pub fn change(
        &self,
        store: &mut dyn PreferenceStore,
        key: &str,
        raw: &str,
    ) -> Result<ChangeOutcome, HalError> {
        let control = self
            .control(key)
            .ok_or_else(|| HalError::UnknownControl(key.to_string()))?;

        if !self.is_enabled(control, store) {
            return Err(HalError::ControlDisabled(key.to_string()));
        }

        let value = control.parse(raw)?;
        let writes = control.change_writes(&value);
        let written = control.apply(&self.channel, &writes);
        if written < writes.len() {
            tracing::warn!(
                "{}: {} of {} writes failed",
                control.id(),
                writes.len() - written,
                writes.len()
            );
        }

        store.put(control.key(), PrefValue::from(&value));
        tracing::info!("{} set to {}", control.id(), value);

        let mut dependents = Vec::new();
        if let (ControlId::TouchkeyLight, ControlValue::Toggle(on)) = (control.id(), &value) {
            if let Some(timeout) = self.control_by_id(ControlId::TouchkeyTimeout) {
                dependents.push((
                    ControlId::TouchkeyTimeout,
                    *on && timeout.is_supported(&self.channel),
                ));
            }
        }

        Ok(ChangeOutcome {
            value,
            written,
            dependents,
        })
    }

    /// Re-apply persisted values, once per control point.
    ///
    /// Returns how many control points wrote something.
    pub fn restore(&self, store: &dyn PreferenceStore) -> usize {
        let mut restored = 0;

        for control in &self.controls {
            if !control.is_supported(&self.channel) {
                continue;
            }

            let persisted = self.persisted_value(control, store);
            let writes = control.restore_writes(persisted.as_ref());
            if writes.is_empty() {
                tracing::debug!("{}: nothing to restore", control.id());
                continue;
            }

            if control.apply(&self.channel, &writes) > 0 {
                restored += 1;
            }
        }

        tracing::info!("Restored {} control points", restored);
        restored
    }

    /// Recalibrate the gyroscope.
    ///
    /// The driver calibrates when calibration use goes from disabled to
    /// enabled, so this writes `0` then `1`. Returns false when unsupported.
    pub fn calibrate_gyro(&self) -> bool {
        let Some(gyro) = self.control_by_id(ControlId::GyroCalibration) else {
            return false;
        };

        if !gyro.is_supported(&self.channel) {
            tracing::warn!("Gyroscope calibration not supported");
            return false;
        }

        let writes = [
            gyro.change_writes(&ControlValue::Toggle(false)),
            gyro.change_writes(&ControlValue::Toggle(true)),
        ]
        .concat();
        let written = gyro.apply(&self.channel, &writes);
        tracing::info!("Gyroscope calibrated ({} writes)", written);
        written == writes.len()
    }
}
