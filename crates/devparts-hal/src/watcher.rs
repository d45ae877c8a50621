//! Platform signal watcher
//!
//! Turns the HDMI switch state and the screen power state into
//! [`PlatformSignal`]s by polling their pseudo-files and reporting changes.

use crate::sysfs::SysfsChannel;
use crate::tvout::{HDMI_PLUGGED, PlatformSignal};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HDMI switch state file
pub const DEFAULT_HDMI_STATE_PATH: &str = "/sys/devices/virtual/switch/hdmi/state";

/// How to interpret a screen state file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenProbeKind {
    /// Framebuffer blank state, 0 = unblanked
    FbBlank,
    /// Backlight brightness, above 0 = on
    BacklightBrightness,
    /// Backlight power, 0 = on
    BlPower,
}

/// A screen state file and how to read it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenProbe {
    pub kind: ScreenProbeKind,
    pub path: PathBuf,
}

impl ScreenProbe {
    pub fn new(kind: ScreenProbeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Pick the first known screen state file present on this kernel
    pub fn detect(channel: &dyn SysfsChannel) -> Option<Self> {
        let candidates = [
            (ScreenProbeKind::FbBlank, "/sys/class/graphics/fb0/blank"),
            (ScreenProbeKind::BlPower, "/sys/class/backlight/panel/bl_power"),
            (
                ScreenProbeKind::BacklightBrightness,
                "/sys/class/backlight/panel/brightness",
            ),
        ];

        candidates
            .into_iter()
            .find(|(_, path)| channel.exists(Path::new(path)))
            .map(|(kind, path)| {
                tracing::debug!("Using screen probe {:?} at {}", kind, path);
                Self::new(kind, path)
            })
    }

    /// Current screen state, `None` if unreadable
    pub fn screen_on(&self, channel: &dyn SysfsChannel) -> Option<bool> {
        let value: i32 = channel.read(&self.path).ok()?.parse().ok()?;
        Some(match self.kind {
            ScreenProbeKind::FbBlank | ScreenProbeKind::BlPower => value == 0,
            ScreenProbeKind::BacklightBrightness => value > 0,
        })
    }
}

/// Polls HDMI and screen state and reports changes
pub struct SignalWatcher<C: SysfsChannel> {
    channel: C,
    hdmi_path: PathBuf,
    screen: Option<ScreenProbe>,
    last_hdmi: Option<i32>,
    last_screen: Option<bool>,
}

impl<C: SysfsChannel> SignalWatcher<C> {
    pub fn new(channel: C, hdmi_path: impl Into<PathBuf>, screen: Option<ScreenProbe>) -> Self {
        Self {
            channel,
            hdmi_path: hdmi_path.into(),
            screen,
            last_hdmi: None,
            last_screen: None,
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Read the state files once and return the signals for what changed.
    ///
    /// The first HDMI reading is reported only when a cable is plugged; the
    /// first screen reading only seeds the watcher.
    pub fn poll(&mut self) -> Vec<PlatformSignal> {
        let mut signals = Vec::new();

        if let Some(state) = self.read_hdmi() {
            match self.last_hdmi {
                None if state == HDMI_PLUGGED => signals.push(PlatformSignal::HdmiPlug { state }),
                Some(last) if last != state => signals.push(PlatformSignal::HdmiPlug { state }),
                _ => {}
            }
            self.last_hdmi = Some(state);
        }

        let screen_on = self
            .screen
            .as_ref()
            .and_then(|probe| probe.screen_on(&self.channel));
        if let Some(on) = screen_on {
            if self.last_screen.is_some_and(|last| last != on) {
                signals.push(if on {
                    PlatformSignal::ScreenOn
                } else {
                    PlatformSignal::ScreenOff
                });
            }
            self.last_screen = Some(on);
        }

        for signal in &signals {
            tracing::debug!("Observed {}", signal);
        }
        signals
    }

    fn read_hdmi(&self) -> Option<i32> {
        match self.channel.read(&self.hdmi_path) {
            Ok(contents) => contents.parse().ok(),
            Err(e) => {
                tracing::trace!("HDMI state unreadable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryChannel;

    const FB_BLANK: &str = "/sys/class/graphics/fb0/blank";

    fn watcher(channel: &MemoryChannel) -> SignalWatcher<MemoryChannel> {
        SignalWatcher::new(
            channel.clone(),
            DEFAULT_HDMI_STATE_PATH,
            Some(ScreenProbe::new(ScreenProbeKind::FbBlank, FB_BLANK)),
        )
    }

    #[test]
    fn test_first_reading_unplugged_is_silent() {
        let channel = MemoryChannel::new();
        channel.add_file(DEFAULT_HDMI_STATE_PATH, "0");
        channel.add_file(FB_BLANK, "0");

        let mut watcher = watcher(&channel);
        assert!(watcher.poll().is_empty());
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_first_reading_plugged_reports_plug() {
        let channel = MemoryChannel::new();
        channel.add_file(DEFAULT_HDMI_STATE_PATH, "1\n");

        let mut watcher = watcher(&channel);
        assert_eq!(watcher.poll(), vec![PlatformSignal::HdmiPlug { state: 1 }]);
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_hdmi_changes() {
        let channel = MemoryChannel::new();
        channel.add_file(DEFAULT_HDMI_STATE_PATH, "0");
        let mut watcher = watcher(&channel);
        watcher.poll();

        channel.add_file(DEFAULT_HDMI_STATE_PATH, "1");
        assert_eq!(watcher.poll(), vec![PlatformSignal::HdmiPlug { state: 1 }]);

        channel.add_file(DEFAULT_HDMI_STATE_PATH, "0");
        assert_eq!(watcher.poll(), vec![PlatformSignal::HdmiPlug { state: 0 }]);
    }

    #[test]
    fn test_screen_transitions() {
        let channel = MemoryChannel::new();
        channel.add_file(FB_BLANK, "0");
        let mut watcher = watcher(&channel);
        assert!(watcher.poll().is_empty());

        channel.add_file(FB_BLANK, "1");
        assert_eq!(watcher.poll(), vec![PlatformSignal::ScreenOff]);

        channel.add_file(FB_BLANK, "0");
        assert_eq!(watcher.poll(), vec![PlatformSignal::ScreenOn]);
    }

    #[test]
    fn test_unreadable_files_produce_nothing() {
        let channel = MemoryChannel::new();
        channel.add_file(DEFAULT_HDMI_STATE_PATH, "garbage");
        let mut watcher = watcher(&channel);
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_probe_kinds() {
        let channel = MemoryChannel::new();
        channel.add_file("/sys/class/backlight/panel/brightness", "0");
        let probe = ScreenProbe::detect(&channel).unwrap();
        assert_eq!(probe.kind, ScreenProbeKind::BacklightBrightness);
        assert_eq!(probe.screen_on(&channel), Some(false));

        channel.add_file("/sys/class/backlight/panel/brightness", "120");
        assert_eq!(probe.screen_on(&channel), Some(true));

        channel.add_file("/sys/class/backlight/panel/bl_power", "0");
        let probe = ScreenProbe::detect(&channel).unwrap();
        assert_eq!(probe.kind, ScreenProbeKind::BlPower);
        assert_eq!(probe.screen_on(&channel), Some(true));

        assert!(ScreenProbe::detect(&MemoryChannel::new()).is_none());
    }
}
