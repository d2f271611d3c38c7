//! Session state shared between the session worker and the UI
//!
//! - **Worker**: writes transport state, retry count and errors
//! - **UI**: reads snapshots each frame, sends commands
//!
//! The coarse [`AppState`] used for view selection is never stored. It is
//! projected from the stored [`TransportState`] whenever it is read, so the
//! two can't disagree.

use crate::error::DemoError;
use crate::transport::{MediaDevices, TransportState};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Number of automatic retries after a failed start
pub const MAX_RETRIES: u32 = 3;

/// View-level connection state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppState {
    /// Transport not ready for a session
    #[default]
    Idle,
    /// A session can be started
    Ready,
    /// A session is being established
    Connecting,
    /// A session is active
    Connected,
}

impl AppState {
    /// Project a transport state onto the view state
    pub fn project(transport: TransportState) -> Self {
        match transport {
            TransportState::Initialized => AppState::Ready,
            TransportState::Handshaking | TransportState::Connecting => AppState::Connecting,
            TransportState::Connected | TransportState::Ready => AppState::Connected,
            _ => AppState::Idle,
        }
    }

    /// Check if a session can be started
    pub fn is_ready(&self) -> bool {
        matches!(self, AppState::Ready)
    }

    /// Check if a session is active
    pub fn is_connected(&self) -> bool {
        matches!(self, AppState::Connected)
    }
}

impl From<TransportState> for AppState {
    fn from(transport: TransportState) -> Self {
        AppState::project(transport)
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::Idle => write!(f, "idle"),
            AppState::Ready => write!(f, "ready"),
            AppState::Connecting => write!(f, "connecting"),
            AppState::Connected => write!(f, "connected"),
        }
    }
}

/// Session state owned by one session worker
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    transport: TransportState,
    /// Terminal error shown in the banner (first one wins)
    pub error: Option<String>,
    /// Automatic retries used by the current start sequence
    pub retry_count: u32,
    /// Join with the microphone muted
    pub start_audio_off: bool,
    /// Last microphone state requested by us
    pub mic_enabled: bool,
    /// Devices reported by the transport
    pub devices: MediaDevices,
    /// A start sequence is in flight
    pub starting: bool,
    /// Leave finished; the worker should be replaced
    pub reload_requested: bool,
}

impl SessionState {
    /// Create a new default state
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest transport state seen
    pub fn transport_state(&self) -> TransportState {
        self.transport
    }

    /// Record a transport state change
    pub fn set_transport_state(&mut self, state: TransportState) {
        self.transport = state;
    }

    /// View state for the current transport state
    pub fn app_state(&self) -> AppState {
        AppState::project(self.transport)
    }

    /// Check if a terminal error is showing
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Check if the start control should accept a press
    pub fn can_start(&self) -> bool {
        self.app_state().is_ready() && !self.starting && !self.has_error()
    }

    /// Set the terminal error unless one is already set
    ///
    /// Returns whether the message was stored.
    pub fn fail(&mut self, error: &DemoError) -> bool {
        if self.error.is_some() {
            return false;
        }
        self.error = Some(error.user_message());
        true
    }

    /// Create an immutable snapshot of current state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            transport: self.transport,
            app: self.app_state(),
            error: self.error.clone(),
            retry_count: self.retry_count,
            start_audio_off: self.start_audio_off,
            mic_enabled: self.mic_enabled,
            devices: self.devices.clone(),
            starting: self.starting,
        }
    }
}

/// Immutable snapshot of session state, read by the UI each frame
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub transport: TransportState,
    pub app: AppState,
    pub error: Option<String>,
    pub retry_count: u32,
    pub start_audio_off: bool,
    pub mic_enabled: bool,
    pub devices: MediaDevices,
    pub starting: bool,
}

impl SessionSnapshot {
    /// Snapshot for a given transport state with everything else default
    pub fn at(transport: TransportState) -> Self {
        Self {
            transport,
            app: AppState::project(transport),
            ..Default::default()
        }
    }

    /// Check if the start control should accept a press
    pub fn can_start(&self) -> bool {
        self.app.is_ready() && !self.starting && self.error.is_none()
    }
}

/// Thread-safe shared session state
///
/// This wraps `SessionState` in `Arc<RwLock<>>` for safe concurrent access.
#[derive(Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionState>>,
}

impl SharedSessionState {
    /// Create a new shared state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a read lock on the state
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, SessionState> {
        self.inner.read()
    }

    /// Get a write lock on the state
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, SessionState> {
        self.inner.write()
    }

    /// Get a snapshot of current state (no lock held after return)
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().snapshot()
    }

    pub fn transport_state(&self) -> TransportState {
        self.inner.read().transport_state()
    }

    pub fn app_state(&self) -> AppState {
        self.inner.read().app_state()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    pub fn retry_count(&self) -> u32 {
        self.inner.read().retry_count
    }

    pub fn is_starting(&self) -> bool {
        self.inner.read().starting
    }

    pub fn start_audio_off(&self) -> bool {
        self.inner.read().start_audio_off
    }

    pub fn is_reload_requested(&self) -> bool {
        self.inner.read().reload_requested
    }
}

/// Commands sent from the UI to the session worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start a session (the Start button)
    Start,
    /// Set the "start with audio off" preference
    SetStartAudioOff(bool),
    /// Turn the microphone on or off during a session
    EnableMic(bool),
    /// Switch microphone
    SelectMic(String),
    /// Switch speaker
    SelectSpeaker(String),
    /// Disconnect and reload
    Leave,
    /// Stop the worker
    Shutdown,
}

/// Events emitted by the session worker
///
/// These are used for UI updates and logging. State should be queried
/// from `SharedSessionState` rather than reconstructed from events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Transport state changed
    StateChanged(TransportState),
    /// A failed start is being retried
    Retrying { attempt: u32, max: u32 },
    /// Session start succeeded
    Started,
    /// A terminal error was set
    Failed(DemoError),
    /// Disconnect finished; the application should reload
    ReloadRequested,
    /// Worker stopped
    Shutdown,
}
