//! TV-out session control
//!
//! The vendor TV-out driver mirrors the screen over HDMI. Its session is
//! driven by three platform signals: the HDMI cable plug state, screen on and
//! screen off. [`TvOutSessionState::on_signal`] is the pure transition
//! function; [`TvOutController`] owns the driver handle and executes the
//! resulting [`DriverAction`]s.
//!
//! Plug versus unplug is decided by the signal's plug state. The session's own
//! `stream_enabled` flag is only the precondition, so a repeated plug event
//! while streaming is ignored rather than tearing the stream down.

use crate::HalError;
use serde::Serialize;
use std::fmt;

/// Plug state reported by the HDMI switch when a cable is connected
pub const HDMI_PLUGGED: i32 = 1;

/// Capabilities of an open TV-out driver session
pub trait TvOutDriver: Send {
    fn status(&self) -> bool;
    fn set_status(&mut self, enabled: bool) -> bool;

    fn cable_status(&self) -> bool;
    fn set_cable_status(&mut self, connected: bool) -> bool;

    fn suspend_status(&self) -> bool;
    fn set_suspend_status(&mut self, suspended: bool) -> bool;

    fn subtitle_status(&self) -> bool;
    fn set_subtitle_status(&mut self, enabled: bool) -> bool;
    fn post_subtitle(&mut self, text: &str, param: i32) -> bool;

    fn post_suspend(&mut self, text: &str) -> bool;
    fn set_output_mode(&mut self, mode: i32) -> bool;
    fn set_resolution(&mut self, resolution: i32) -> bool;
    fn set_default_string(&mut self, text: &str) -> bool;

    /// Close the session. Calling it again must be harmless.
    fn release(&mut self);
}

/// Opens driver sessions
pub trait DriverFactory {
    fn open(&self) -> Result<Box<dyn TvOutDriver>, HalError>;
}

/// Signals the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSignal {
    /// HDMI cable plug state changed
    HdmiPlug { state: i32 },
    ScreenOn,
    ScreenOff,
}

impl fmt::Display for PlatformSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformSignal::HdmiPlug { state } => write!(f, "hdmi-plug(state={})", state),
            PlatformSignal::ScreenOn => f.write_str("screen-on"),
            PlatformSignal::ScreenOff => f.write_str("screen-off"),
        }
    }
}

/// Driver call emitted by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverAction {
    /// Open the driver session if none is held
    Acquire,
    SetStatus(bool),
    SetCableStatus(bool),
    SetSuspendStatus(bool),
    /// Close the driver session if one is held
    Release,
}

/// Everything the controller tracks about the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TvOutSessionState {
    pub handle_present: bool,
    pub stream_enabled: bool,
    pub cable_connected: bool,
    pub suspended: bool,
    pub was_playing_before_screen_off: bool,
}

/// Next state plus the driver calls that get there
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: TvOutSessionState,
    pub actions: Vec<DriverAction>,
}

impl TvOutSessionState {
    /// Compute the transition for a signal
    pub fn on_signal(self, signal: PlatformSignal) -> Transition {
        match signal {
            PlatformSignal::HdmiPlug { state: HDMI_PLUGGED } if !self.stream_enabled => Transition {
                next: TvOutSessionState {
                    handle_present: true,
                    stream_enabled: true,
                    cable_connected: true,
                    suspended: false,
                    was_playing_before_screen_off: false,
                },
                actions: vec![
                    DriverAction::Acquire,
                    DriverAction::SetStatus(true),
                    DriverAction::SetCableStatus(true),
                    DriverAction::SetSuspendStatus(false),
                ],
            },
            PlatformSignal::HdmiPlug { state: HDMI_PLUGGED } => self.unchanged(),
            PlatformSignal::HdmiPlug { .. } if self.stream_enabled => Transition {
                next: TvOutSessionState::default(),
                actions: vec![
                    DriverAction::SetStatus(false),
                    DriverAction::SetCableStatus(false),
                    DriverAction::Release,
                ],
            },
            PlatformSignal::HdmiPlug { .. } if self.handle_present => Transition {
                next: TvOutSessionState::default(),
                actions: vec![DriverAction::Release],
            },
            PlatformSignal::ScreenOff if self.handle_present && self.stream_enabled => Transition {
                next: TvOutSessionState {
                    suspended: true,
                    was_playing_before_screen_off: true,
                    ..self
                },
                actions: vec![DriverAction::SetSuspendStatus(true)],
            },
            PlatformSignal::ScreenOn
                if self.handle_present && self.was_playing_before_screen_off =>
            {
                Transition {
                    next: TvOutSessionState {
                        suspended: false,
                        was_playing_before_screen_off: false,
                        ..self
                    },
                    actions: vec![DriverAction::SetSuspendStatus(false)],
                }
            }
            _ => self.unchanged(),
        }
    }

    fn unchanged(self) -> Transition {
        Transition {
            next: self,
            actions: Vec::new(),
        }
    }
}

/// Snapshot of what the driver itself reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverStatus {
    pub streaming: bool,
    pub cable_connected: bool,
    pub suspended: bool,
    pub subtitles: bool,
}

/// Owns the driver handle and applies transitions
pub struct TvOutController<F: DriverFactory> {
    factory: F,
    driver: Option<Box<dyn TvOutDriver>>,
    state: TvOutSessionState,
}

impl<F: DriverFactory> TvOutController<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            driver: None,
            state: TvOutSessionState::default(),
        }
    }

    pub fn state(&self) -> TvOutSessionState {
        self.state
    }

    pub fn has_handle(&self) -> bool {
        self.driver.is_some()
    }

    /// React to a platform signal.
    ///
    /// If the driver cannot be opened the state is left unchanged and the
    /// next signal tries again.
    pub fn handle(&mut self, signal: PlatformSignal) -> TvOutSessionState {
        let transition = self.state.on_signal(signal);
        if transition.actions.is_empty() {
            tracing::trace!("Ignoring {} in state {:?}", signal, self.state);
            return self.state;
        }

        match signal {
            PlatformSignal::HdmiPlug { state: HDMI_PLUGGED } => tracing::info!("HDMI plugged"),
            PlatformSignal::HdmiPlug { .. } => tracing::info!("HDMI unplugged"),
            PlatformSignal::ScreenOff => tracing::info!("Screen off - pausing TV-out stream"),
            PlatformSignal::ScreenOn => tracing::info!("Screen on - resuming TV-out stream"),
        }

        if self.execute(&transition.actions) {
            self.state = transition.next;
            debug_assert_eq!(self.state.handle_present, self.driver.is_some());
        }
        self.state
    }

    fn execute(&mut self, actions: &[DriverAction]) -> bool {
        for action in actions {
            match action {
                DriverAction::Acquire => {
                    if !self.acquire() {
                        return false;
                    }
                }
                DriverAction::Release => self.release_driver(),
                DriverAction::SetStatus(enabled) => {
                    self.with_driver(|d| d.set_status(*enabled), "set_status");
                }
                DriverAction::SetCableStatus(connected) => {
                    self.with_driver(|d| d.set_cable_status(*connected), "set_cable_status");
                }
                DriverAction::SetSuspendStatus(suspended) => {
                    self.with_driver(|d| d.set_suspend_status(*suspended), "set_suspend_status");
                }
            }
        }
        true
    }

    fn with_driver(&mut self, call: impl FnOnce(&mut dyn TvOutDriver) -> bool, name: &str) -> bool {
        match self.driver.as_deref_mut() {
            Some(driver) => {
                let ok = call(driver);
                if !ok {
                    tracing::debug!("TV-out driver rejected {}", name);
                }
                ok
            }
            None => false,
        }
    }

    fn acquire(&mut self) -> bool {
        if self.driver.is_some() {
            return true;
        }

        match self.factory.open() {
            Ok(driver) => {
                tracing::debug!("TV-out driver opened");
                self.driver = Some(driver);
                true
            }
            Err(e) => {
                tracing::warn!("TV-out driver unavailable: {}", e);
                false
            }
        }
    }

    fn release_driver(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.release();
            tracing::debug!("TV-out driver released");
        }
    }

    /// Close the driver session and return to idle. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.release_driver();
        self.state = TvOutSessionState::default();
    }

    /// Query the driver, opening it if needed
    pub fn driver_status(&mut self) -> Option<DriverStatus> {
        if !self.acquire() {
            return None;
        }
        self.state.handle_present = true;

        self.driver.as_deref().map(|d| DriverStatus {
            streaming: d.status(),
            cable_connected: d.cable_status(),
            suspended: d.suspend_status(),
            subtitles: d.subtitle_status(),
        })
    }

    fn passthrough(&mut self, call: impl FnOnce(&mut dyn TvOutDriver) -> bool, name: &str) -> bool {
        if !self.acquire() {
            return false;
        }
        self.state.handle_present = true;
        self.with_driver(call, name)
    }

    pub fn set_resolution(&mut self, resolution: i32) -> bool {
        self.passthrough(|d| d.set_resolution(resolution), "set_resolution")
    }

    pub fn set_output_mode(&mut self, mode: i32) -> bool {
        self.passthrough(|d| d.set_output_mode(mode), "set_output_mode")
    }

    pub fn set_subtitle_status(&mut self, enabled: bool) -> bool {
        self.passthrough(|d| d.set_subtitle_status(enabled), "set_subtitle_status")
    }

    pub fn post_subtitle(&mut self, text: &str, param: i32) -> bool {
        self.passthrough(|d| d.post_subtitle(text, param), "post_subtitle")
    }
}

impl<F: DriverFactory> Drop for TvOutController<F> {
    fn drop(&mut self) {
        self.release_driver();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTvOutFactory;

    const PLUG: PlatformSignal = PlatformSignal::HdmiPlug { state: HDMI_PLUGGED };
    const UNPLUG: PlatformSignal = PlatformSignal::HdmiPlug { state: 0 };

    fn streaming() -> TvOutSessionState {
        TvOutSessionState::default().on_signal(PLUG).next
    }

    #[test]
    fn test_plug_when_idle() {
        let t = TvOutSessionState::default().on_signal(PLUG);
        assert!(t.next.handle_present);
        assert!(t.next.stream_enabled);
        assert!(t.next.cable_connected);
        assert!(!t.next.suspended);
        assert_eq!(t.actions[0], DriverAction::Acquire);
        assert!(t.actions.contains(&DriverAction::SetSuspendStatus(false)));
    }

    #[test]
    fn test_plug_when_streaming_is_ignored() {
        let state = streaming();
        let t = state.on_signal(PLUG);
        assert_eq!(t.next, state);
        assert!(t.actions.is_empty());
    }

    #[test]
    fn test_unplug_when_streaming() {
        let t = streaming().on_signal(UNPLUG);
        assert_eq!(t.next, TvOutSessionState::default());
        assert_eq!(
            t.actions,
            vec![
                DriverAction::SetStatus(false),
                DriverAction::SetCableStatus(false),
                DriverAction::Release,
            ]
        );
    }

    #[test]
    fn test_unplug_when_idle() {
        let t = TvOutSessionState::default().on_signal(UNPLUG);
        assert!(t.actions.is_empty());

        let held = TvOutSessionState {
            handle_present: true,
            ..Default::default()
        };
        assert_eq!(held.on_signal(UNPLUG).actions, vec![DriverAction::Release]);
    }

    #[test]
    fn test_screen_off_then_on() {
        let off = streaming().on_signal(PlatformSignal::ScreenOff);
        assert!(off.next.suspended);
        assert!(off.next.was_playing_before_screen_off);
        assert_eq!(off.actions, vec![DriverAction::SetSuspendStatus(true)]);

        let on = off.next.on_signal(PlatformSignal::ScreenOn);
        assert!(!on.next.suspended);
        assert!(!on.next.was_playing_before_screen_off);
        assert!(on.next.stream_enabled);
        assert_eq!(on.actions, vec![DriverAction::SetSuspendStatus(false)]);
    }

    #[test]
    fn test_screen_on_without_flag() {
        let state = streaming();
        let t = state.on_signal(PlatformSignal::ScreenOn);
        assert_eq!(t.next, state);
        assert!(t.actions.is_empty());
    }

    #[test]
    fn test_screen_off_when_idle() {
        let t = TvOutSessionState::default().on_signal(PlatformSignal::ScreenOff);
        assert!(t.actions.is_empty());
        assert!(!t.next.suspended);
    }

    #[test]
    fn test_controller_plug_and_unplug() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        let mut controller = TvOutController::new(factory);

        let state = controller.handle(PLUG);
        assert!(state.stream_enabled);
        assert!(controller.has_handle());
        {
            let d = driver.read().unwrap();
            assert!(d.status);
            assert!(d.cable);
            assert!(!d.suspend);
            assert_eq!(d.setup_count, 1);
        }

        let state = controller.handle(UNPLUG);
        assert!(!state.stream_enabled);
        assert!(!controller.has_handle());
        let d = driver.read().unwrap();
        assert!(!d.status);
        assert!(!d.cable);
        assert_eq!(d.release_count, 1);
    }

    #[test]
    fn test_controller_suspend_resume() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        let mut controller = TvOutController::new(factory);

        controller.handle(PLUG);
        controller.handle(PlatformSignal::ScreenOff);
        assert!(driver.read().unwrap().suspend);
        assert!(controller.state().was_playing_before_screen_off);

        controller.handle(PlatformSignal::ScreenOn);
        assert!(!driver.read().unwrap().suspend);
        assert!(!controller.state().was_playing_before_screen_off);
    }

    #[test]
    fn test_controller_acquire_failure_is_silent() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        driver.write().unwrap().fail_setup = true;
        let mut controller = TvOutController::new(factory);

        let state = controller.handle(PLUG);
        assert_eq!(state, TvOutSessionState::default());
        assert!(!controller.has_handle());

        // Screen signals are no-ops without a handle
        controller.handle(PlatformSignal::ScreenOff);
        assert_eq!(controller.state(), TvOutSessionState::default());

        // A later plug retries
        driver.write().unwrap().fail_setup = false;
        assert!(controller.handle(PLUG).stream_enabled);
        assert_eq!(driver.read().unwrap().setup_count, 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        let mut controller = TvOutController::new(factory);

        controller.handle(PLUG);
        controller.release();
        controller.release();
        assert_eq!(driver.read().unwrap().release_count, 1);
        assert!(!controller.state().handle_present);

        drop(controller);
        assert_eq!(driver.read().unwrap().release_count, 1);
    }

    #[test]
    fn test_drop_releases_handle() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        {
            let mut controller = TvOutController::new(factory);
            controller.handle(PLUG);
        }
        assert_eq!(driver.read().unwrap().release_count, 1);
    }

    #[test]
    fn test_passthroughs_open_driver() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        let mut controller = TvOutController::new(factory);

        assert!(controller.set_resolution(2));
        assert!(controller.set_output_mode(1));
        assert!(controller.set_subtitle_status(true));
        assert!(controller.post_subtitle("hello", 0));
        assert!(controller.state().handle_present);

        let status = controller.driver_status().unwrap();
        assert!(!status.streaming);
        assert!(status.subtitles);

        let d = driver.read().unwrap();
        assert_eq!(d.resolution, 2);
        assert_eq!(d.output_mode, 1);
        assert_eq!(d.last_subtitle.as_deref(), Some("hello"));
        assert_eq!(d.setup_count, 1);
    }

    #[test]
    fn test_unplug_releases_passthrough_handle() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        let mut controller = TvOutController::new(factory);

        controller.driver_status();
        controller.handle(UNPLUG);
        assert!(!controller.has_handle());
        assert_eq!(driver.read().unwrap().release_count, 1);
    }

    #[test]
    fn test_plug_after_release_reacquires() {
        let factory = MockTvOutFactory::new();
        let driver = factory.state();
        let mut controller = TvOutController::new(factory);

        controller.handle(PLUG);
        controller.release();
        assert_eq!(controller.state(), TvOutSessionState::default());

        let state = controller.handle(PLUG);
        assert!(state.stream_enabled);
        assert!(controller.has_handle());

        let d = driver.read().unwrap();
        assert_eq!(d.setup_count, 2);
        assert_eq!(d.release_count, 1);
    }
}
