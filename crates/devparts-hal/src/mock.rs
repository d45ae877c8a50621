//! Mock implementations for testing without real hardware
//!
//! This module provides in-memory backends for the sysfs channel, the
//! persisted preferences and the TV-out driver, allowing development and
//! testing on desktop systems without the handset.
//!
//! # Usage
//!
//! ```
//! use devparts_hal::mock::{MemoryChannel, MemoryPreferences};
//! use devparts_hal::{SettingsPanel, default_control_points};
//!
//! let channel = MemoryChannel::new();
//! channel.add_file("/sys/class/sec/sec_touchkey/led_timeout", "3");
//!
//! let panel = SettingsPanel::new(channel, default_control_points());
//! let mut prefs = MemoryPreferences::new();
//! panel.change(&mut prefs, "touchkey_timeout", "10").unwrap();
//! assert_eq!(
//!     panel.channel().contents("/sys/class/sec/sec_touchkey/led_timeout"),
//!     Some("10".to_string())
//! );
//! ```

use crate::HalError;
use crate::panel::{PrefValue, PreferenceStore};
use crate::sysfs::SysfsChannel;
use crate::tvout::{DriverFactory, TvOutDriver};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Shared state behind a [`MemoryChannel`]
#[derive(Debug, Default)]
pub struct MockSysfs {
    /// Current file contents
    pub files: HashMap<PathBuf, String>,
    /// Files whose writes fail with permission denied
    pub read_only: HashSet<PathBuf>,
    /// Successful writes per file, oldest first
    pub writes: HashMap<PathBuf, Vec<String>>,
}

/// In-memory sysfs tree
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    state: Arc<RwLock<MockSysfs>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a pseudo-file without recording a write
    pub fn add_file(&self, path: impl AsRef<Path>, contents: &str) {
        let mut state = self.state.write().unwrap();
        state
            .files
            .insert(path.as_ref().to_path_buf(), contents.to_string());
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let mut state = self.state.write().unwrap();
        state.files.remove(path.as_ref());
    }

    pub fn set_read_only(&self, path: impl AsRef<Path>, read_only: bool) {
        let mut state = self.state.write().unwrap();
        let path = path.as_ref().to_path_buf();
        if read_only {
            state.read_only.insert(path);
        } else {
            state.read_only.remove(&path);
        }
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state.read().unwrap().files.get(path.as_ref()).cloned()
    }

    /// Tokens written to `path` through the channel
    pub fn write_log(&self, path: impl AsRef<Path>) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .writes
            .get(path.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

impl SysfsChannel for MemoryChannel {
    fn exists(&self, path: &Path) -> bool {
        self.state.read().unwrap().files.contains_key(path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.state
            .read()
            .unwrap()
            .files
            .get(path)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, token: &str) -> io::Result<()> {
        let mut state = self.state.write().unwrap();
        if !state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                path.display().to_string(),
            ));
        }
        if state.read_only.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                path.display().to_string(),
            ));
        }

        state.files.insert(path.to_path_buf(), token.to_string());
        state
            .writes
            .entry(path.to_path_buf())
            .or_default()
            .push(token.to_string());
        Ok(())
    }
}

/// In-memory preference store
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, PrefValue>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: PrefValue) {
        self.values.insert(key.to_string(), value);
    }
}

/// Mock TV-out driver state, shared between the factory and the sessions it opens
#[derive(Debug, Default)]
pub struct MockTvOutState {
    pub status: bool,
    pub cable: bool,
    pub suspend: bool,
    pub subtitle: bool,
    pub resolution: i32,
    pub output_mode: i32,
    pub last_subtitle: Option<String>,
    pub last_suspend_text: Option<String>,
    pub default_string: Option<String>,
    /// Sessions opened successfully
    pub setup_count: u32,
    /// Sessions released
    pub release_count: u32,
    /// Make the next `open` calls fail
    pub fail_setup: bool,
}

/// Mock TV-out driver session
pub struct MockTvOut {
    state: Arc<RwLock<MockTvOutState>>,
    released: bool,
}

impl TvOutDriver for MockTvOut {
    fn status(&self) -> bool {
        self.state.read().unwrap().status
    }

    fn set_status(&mut self, enabled: bool) -> bool {
        self.state.write().unwrap().status = enabled;
        true
    }

    fn cable_status(&self) -> bool {
        self.state.read().unwrap().cable
    }

    fn set_cable_status(&mut self, connected: bool) -> bool {
        self.state.write().unwrap().cable = connected;
        true
    }

    fn suspend_status(&self) -> bool {
        self.state.read().unwrap().suspend
    }

    fn set_suspend_status(&mut self, suspended: bool) -> bool {
        self.state.write().unwrap().suspend = suspended;
        true
    }

    fn subtitle_status(&self) -> bool {
        self.state.read().unwrap().subtitle
    }

    fn set_subtitle_status(&mut self, enabled: bool) -> bool {
        self.state.write().unwrap().subtitle = enabled;
        true
    }

    fn post_subtitle(&mut self, text: &str, _param: i32) -> bool {
        self.state.write().unwrap().last_subtitle = Some(text.to_string());
        true
    }

    fn post_suspend(&mut self, text: &str) -> bool {
        self.state.write().unwrap().last_suspend_text = Some(text.to_string());
        true
    }

    fn set_output_mode(&mut self, mode: i32) -> bool {
        self.state.write().unwrap().output_mode = mode;
        true
    }

    fn set_resolution(&mut self, resolution: i32) -> bool {
        self.state.write().unwrap().resolution = resolution;
        true
    }

    fn set_default_string(&mut self, text: &str) -> bool {
        self.state.write().unwrap().default_string = Some(text.to_string());
        true
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.write().unwrap().release_count += 1;
        }
    }
}

/// Factory handing out [`MockTvOut`] sessions
#[derive(Debug, Clone, Default)]
pub struct MockTvOutFactory {
    state: Arc<RwLock<MockTvOutState>>,
}

impl MockTvOutFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared driver state for inspection in tests
    pub fn state(&self) -> Arc<RwLock<MockTvOutState>> {
        Arc::clone(&self.state)
    }
}

impl DriverFactory for MockTvOutFactory {
    fn open(&self) -> Result<Box<dyn TvOutDriver>, HalError> {
        let mut state = self.state.write().unwrap();
        if state.fail_setup {
            return Err(HalError::DriverUnavailable("mock setup failure".into()));
        }
        state.setup_count += 1;

        Ok(Box::new(MockTvOut {
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_channel_requires_existing_file() {
        let channel = MemoryChannel::new();
        let path = Path::new("/sys/class/mdnie/mdnie/mode");

        assert!(channel.write(path, "1").is_err());
        channel.add_file(path, "0\n");
        assert_eq!(channel.read(path).unwrap(), "0");
        channel.write(path, "1").unwrap();
        assert_eq!(channel.contents(path), Some("1".into()));
        assert_eq!(channel.write_log(path), vec!["1".to_string()]);

        channel.remove_file(path);
        assert!(!channel.exists(path));
    }

    #[test]
    fn test_memory_channel_read_only() {
        let channel = MemoryChannel::new();
        let path = Path::new("/sys/class/mdnie/mdnie/outdoor");
        channel.add_file(path, "0");
        channel.set_read_only(path, true);

        let err = channel.write(path, "1").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(channel.write_log(path).is_empty());

        channel.set_read_only(path, false);
        assert!(channel.write(path, "1").is_ok());
    }

    #[test]
    fn test_mock_tvout_release_counts_once() {
        let factory = MockTvOutFactory::new();
        let mut driver = factory.open().unwrap();
        driver.release();
        driver.release();
        assert_eq!(factory.state().read().unwrap().release_count, 1);
    }

    #[test]
    fn test_mock_tvout_setup_failure() {
        let factory = MockTvOutFactory::new();
        factory.state().write().unwrap().fail_setup = true;
        assert!(factory.open().is_err());
        assert_eq!(factory.state().read().unwrap().setup_count, 0);
    }

    #[test]
    fn test_memory_preferences() {
        let mut prefs = MemoryPreferences::new();
        assert!(prefs.is_empty());
        prefs.put("touchkey_light", PrefValue::Bool(false));
        assert_eq!(prefs.get("touchkey_light"), Some(PrefValue::Bool(false)));
        assert_eq!(prefs.get("panel_gamma"), None);
    }
}
