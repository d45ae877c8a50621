//! Sysfs channel
//!
//! Every hardware control point talks to its kernel driver through a
//! pseudo-file. The [`SysfsChannel`] trait is the capability handed to control
//! points so they can be exercised against a real tree, a copied tree under a
//! temporary directory, or the in-memory mock.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read/write access to sysfs-style pseudo-files
pub trait SysfsChannel: Send + Sync {
    /// Whether the pseudo-file exists (the only capability probe)
    fn exists(&self, path: &Path) -> bool;

    /// Read the current contents, trimmed
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Replace the contents with `token`
    fn write(&self, path: &Path, token: &str) -> io::Result<()>;
}

/// Channel backed by the real filesystem
///
/// With a root set, absolute paths are resolved below it, so
/// `/sys/class/sec/sec_touchkey/brightness` becomes
/// `<root>/sys/class/sec/sec_touchkey/brightness`.
#[derive(Debug, Clone, Default)]
pub struct FsChannel {
    root: Option<PathBuf>,
}

impl FsChannel {
    /// Channel over the live filesystem
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Channel rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Resolve a device path against the configured root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.strip_prefix("/").unwrap_or(path)),
            None => path.to_path_buf(),
        }
    }
}

impl SysfsChannel for FsChannel {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        Ok(fs::read_to_string(self.resolve(path))?.trim().to_string())
    }

    fn write(&self, path: &Path, token: &str) -> io::Result<()> {
        let resolved = self.resolve(path);

        // sysfs attributes are never created by writers
        if !resolved.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", resolved.display()),
            ));
        }

        fs::write(&resolved, token)?;
        tracing::trace!("Wrote {:?} to {}", token, resolved.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_without_root() {
        let channel = FsChannel::new();
        assert_eq!(
            channel.resolve(Path::new("/sys/class/mdnie/mdnie/mode")),
            PathBuf::from("/sys/class/mdnie/mdnie/mode")
        );
    }

    #[test]
    fn test_resolve_with_root() {
        let channel = FsChannel::with_root("/tmp/fake");
        assert_eq!(
            channel.resolve(Path::new("/sys/class/mdnie/mdnie/mode")),
            PathBuf::from("/tmp/fake/sys/class/mdnie/mdnie/mode")
        );
    }

    #[test]
    fn test_write_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("sys/class/sec/sec_touchkey/led_timeout");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "10\n").unwrap();

        let channel = FsChannel::with_root(dir.path());
        let path = Path::new("/sys/class/sec/sec_touchkey/led_timeout");
        assert!(channel.exists(path));

        channel.write(path, "3").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "3");
        assert_eq!(channel.read(path).unwrap(), "3");
    }

    #[test]
    fn test_write_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let channel = FsChannel::with_root(dir.path());
        let path = Path::new("/sys/class/sec/gsensorcal/calibration");

        assert!(!channel.exists(path));
        let err = channel.write(path, "1").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!dir.path().join("sys").exists());
    }
}
