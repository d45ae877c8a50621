//! Native TV-out driver binding
//!
//! The vendor driver is reached through a small C shim library exporting one
//! function per capability:
//!
//! ```c
//! void *tvout_setup(void);
//! void  tvout_release(void *session);
//! int   tvout_get_status(void *session);
//! int   tvout_set_status(void *session, int enabled);
//! int   tvout_get_cable_status(void *session);
//! int   tvout_set_cable_status(void *session, int connected);
//! int   tvout_get_suspend_status(void *session);
//! int   tvout_set_suspend_status(void *session, int suspended);
//! int   tvout_get_subtitle_status(void *session);
//! int   tvout_set_subtitle_status(void *session, int enabled);
//! int   tvout_post_subtitle(void *session, const char *text, int param);
//! int   tvout_post_suspend(void *session, const char *text);
//! int   tvout_set_output_mode(void *session, int mode);
//! int   tvout_set_resolution(void *session, int resolution);
//! int   tvout_set_default_string(void *session, const char *text);
//! ```
//!
//! Non-zero return values mean true/success.

use crate::HalError;
use crate::tvout::{DriverFactory, TvOutDriver};
use libloading::{Library, Symbol};
use std::ffi::{CString, c_char, c_int, c_void};
use std::path::{Path, PathBuf};

/// An open session with the vendor TV-out driver
pub struct NativeTvOut {
    lib: Library,
    session: *mut c_void,
    released: bool,
}

// Safety: the session pointer is only handed back to the shim library, which
// the Library field keeps loaded, and the controller never shares a session
// between threads.
unsafe impl Send for NativeTvOut {}

impl NativeTvOut {
    /// Load the shim library and open a driver session
    pub fn open(library: &Path) -> Result<Self, HalError> {
        tracing::info!("TV-out initializing from {}", library.display());

        unsafe {
            let lib = Library::new(library)?;

            let session = {
                type SetupFn = unsafe extern "C" fn() -> *mut c_void;
                let setup: Symbol<SetupFn> = lib.get(b"tvout_setup")?;
                setup()
            };

            if session.is_null() {
                return Err(HalError::DriverUnavailable(
                    "tvout_setup returned no session".into(),
                ));
            }

            Ok(Self {
                lib,
                session,
                released: false,
            })
        }
    }

    fn get_flag(&self, symbol: &[u8]) -> bool {
        if self.released {
            return false;
        }

        unsafe {
            type GetFn = unsafe extern "C" fn(*mut c_void) -> c_int;
            match self.lib.get::<GetFn>(symbol) {
                Ok(func) => func(self.session) != 0,
                Err(e) => {
                    tracing::warn!("TV-out symbol missing: {}", e);
                    false
                }
            }
        }
    }

    fn set_int(&mut self, symbol: &[u8], value: c_int) -> bool {
        if self.released {
            return false;
        }

        unsafe {
            type SetFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_int;
            match self.lib.get::<SetFn>(symbol) {
                Ok(func) => func(self.session, value) != 0,
                Err(e) => {
                    tracing::warn!("TV-out symbol missing: {}", e);
                    false
                }
            }
        }
    }

    fn set_text(&mut self, symbol: &[u8], text: &str, param: Option<c_int>) -> bool {
        if self.released {
            return false;
        }

        let Ok(text) = CString::new(text) else {
            tracing::warn!("TV-out text contains a NUL byte");
            return false;
        };

        unsafe {
            match param {
                Some(param) => {
                    type PostFn = unsafe extern "C" fn(*mut c_void, *const c_char, c_int) -> c_int;
                    match self.lib.get::<PostFn>(symbol) {
                        Ok(func) => func(self.session, text.as_ptr(), param) != 0,
                        Err(e) => {
                            tracing::warn!("TV-out symbol missing: {}", e);
                            false
                        }
                    }
                }
                None => {
                    type TextFn = unsafe extern "C" fn(*mut c_void, *const c_char) -> c_int;
                    match self.lib.get::<TextFn>(symbol) {
                        Ok(func) => func(self.session, text.as_ptr()) != 0,
                        Err(e) => {
                            tracing::warn!("TV-out symbol missing: {}", e);
                            false
                        }
                    }
                }
            }
        }
    }
}

impl TvOutDriver for NativeTvOut {
    fn status(&self) -> bool {
        self.get_flag(b"tvout_get_status")
    }

    fn set_status(&mut self, enabled: bool) -> bool {
        self.set_int(b"tvout_set_status", enabled as c_int)
    }

    fn cable_status(&self) -> bool {
        self.get_flag(b"tvout_get_cable_status")
    }

    fn set_cable_status(&mut self, connected: bool) -> bool {
        self.set_int(b"tvout_set_cable_status", connected as c_int)
    }

    fn suspend_status(&self) -> bool {
        self.get_flag(b"tvout_get_suspend_status")
    }

    fn set_suspend_status(&mut self, suspended: bool) -> bool {
        self.set_int(b"tvout_set_suspend_status", suspended as c_int)
    }

    fn subtitle_status(&self) -> bool {
        self.get_flag(b"tvout_get_subtitle_status")
    }

    fn set_subtitle_status(&mut self, enabled: bool) -> bool {
        self.set_int(b"tvout_set_subtitle_status", enabled as c_int)
    }

    fn post_subtitle(&mut self, text: &str, param: i32) -> bool {
        self.set_text(b"tvout_post_subtitle", text, Some(param))
    }

    fn post_suspend(&mut self, text: &str) -> bool {
        self.set_text(b"tvout_post_suspend", text, None)
    }

    fn set_output_mode(&mut self, mode: i32) -> bool {
        self.set_int(b"tvout_set_output_mode", mode)
    }

    fn set_resolution(&mut self, resolution: i32) -> bool {
        self.set_int(b"tvout_set_resolution", resolution)
    }

    fn set_default_string(&mut self, text: &str) -> bool {
        self.set_text(b"tvout_set_default_string", text, None)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        unsafe {
            type ReleaseFn = unsafe extern "C" fn(*mut c_void);
            if let Ok(release) = self.lib.get::<ReleaseFn>(b"tvout_release") {
                release(self.session);
            }
        }
        self.session = std::ptr::null_mut();
    }
}

impl Drop for NativeTvOut {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens [`NativeTvOut`] sessions from a shim library path
#[derive(Debug, Clone)]
pub struct NativeTvOutFactory {
    library: PathBuf,
}

impl NativeTvOutFactory {
    pub fn new(library: impl Into<PathBuf>) -> Self {
        Self {
            library: library.into(),
        }
    }

    pub fn library(&self) -> &Path {
        &self.library
    }
}

impl DriverFactory for NativeTvOutFactory {
    fn open(&self) -> Result<Box<dyn TvOutDriver>, HalError> {
        Ok(Box::new(NativeTvOut::open(&self.library)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvout::{PlatformSignal, TvOutController, TvOutSessionState};
    use tempfile::TempDir;

    #[test]
    fn test_missing_library_is_an_error() {
        let dir = TempDir::new().unwrap();
        let factory = NativeTvOutFactory::new(dir.path().join("libtvout_shim.so"));
        assert_eq!(factory.library(), dir.path().join("libtvout_shim.so"));
        assert!(matches!(factory.open(), Err(HalError::Library(_))));
    }

    #[test]
    fn test_controller_without_library_stays_idle() {
        let dir = TempDir::new().unwrap();
        let factory = NativeTvOutFactory::new(dir.path().join("libtvout_shim.so"));
        let mut controller = TvOutController::new(factory);

        let state = controller.handle(PlatformSignal::HdmiPlug { state: 1 });
        assert_eq!(state, TvOutSessionState::default());
        assert!(controller.driver_status().is_none());
        assert!(!controller.set_resolution(1));
    }
}
