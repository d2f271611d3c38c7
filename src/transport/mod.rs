//! Voice transport abstraction
//!
//! The real-time link to the remote agent lives behind [`VoiceTransport`].
//! The rest of the crate only ever reads the transport state and calls the
//! handful of operations below, so any implementation (the bundled
//! [`SimulatedTransport`] or a real client SDK binding) can be swapped in.

pub mod simulated;

pub use simulated::{SimulatedTransport, SimulationConfig, TransportCall};

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::watch;

/// Connection lifecycle state, owned by the transport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportState {
    /// Nothing has happened yet
    #[default]
    Idle,
    /// Local media devices are being set up
    Initializing,
    /// Devices are ready, a session can be started
    Initialized,
    /// Requesting an agent from the service
    Handshaking,
    /// Joining the media session
    Connecting,
    /// Joined, waiting for the agent
    Connected,
    /// Agent has joined and is ready
    Ready,
    /// Session teardown in progress
    Disconnecting,
    /// Session torn down
    Disconnected,
    /// Transport failed
    Error,
}

impl TransportState {
    /// All states, in lifecycle order
    pub const ALL: [TransportState; 10] = [
        TransportState::Idle,
        TransportState::Initializing,
        TransportState::Initialized,
        TransportState::Handshaking,
        TransportState::Connecting,
        TransportState::Connected,
        TransportState::Ready,
        TransportState::Disconnecting,
        TransportState::Disconnected,
        TransportState::Error,
    ];

    /// Lower-case name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Idle => "idle",
            TransportState::Initializing => "initializing",
            TransportState::Initialized => "initialized",
            TransportState::Handshaking => "handshaking",
            TransportState::Connecting => "connecting",
            TransportState::Connected => "connected",
            TransportState::Ready => "ready",
            TransportState::Disconnecting => "disconnecting",
            TransportState::Disconnected => "disconnected",
            TransportState::Error => "error",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TransportState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown transport state: {}", s))
    }
}

/// Errors reported by a transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Service is at capacity; retrying will not help
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Session start failed for any other reason
    #[error("start failed: {0}")]
    StartFailed(String),

    /// Local media device problem
    #[error("device error: {0}")]
    Device(String),

    /// Teardown failed
    #[error("disconnect failed: {0}")]
    Disconnect(String),
}

impl TransportError {
    /// Whether this is the distinguished rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::RateLimited(_))
    }
}

/// Audio device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    /// Device name
    pub name: String,
    /// Whether this is the system default device
    pub is_default: bool,
}

/// Devices known to the transport and the current selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaDevices {
    pub mics: Vec<AudioDeviceInfo>,
    pub speakers: Vec<AudioDeviceInfo>,
    pub selected_mic: Option<String>,
    pub selected_speaker: Option<String>,
}

impl MediaDevices {
    /// Build a device set, selecting the default device of each kind
    pub fn with_defaults(mics: Vec<AudioDeviceInfo>, speakers: Vec<AudioDeviceInfo>) -> Self {
        let pick = |devices: &[AudioDeviceInfo]| {
            devices
                .iter()
                .find(|d| d.is_default)
                .or_else(|| devices.first())
                .map(|d| d.name.clone())
        };
        Self {
            selected_mic: pick(&mics),
            selected_speaker: pick(&speakers),
            mics,
            speakers,
        }
    }

    /// Whether `name` is a known microphone
    pub fn has_mic(&self, name: &str) -> bool {
        self.mics.iter().any(|d| d.name == name)
    }

    /// Whether `name` is a known speaker
    pub fn has_speaker(&self, name: &str) -> bool {
        self.speakers.iter().any(|d| d.name == name)
    }
}

/// Real-time voice transport
///
/// `state` must always return the live value; the watchdog depends on it.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    /// Current transport state
    fn state(&self) -> TransportState;

    /// Observe state changes
    fn subscribe(&self) -> watch::Receiver<TransportState>;

    /// Set up local media devices
    async fn init_devices(&self) -> Result<(), TransportError>;

    /// Turn the local microphone on or off
    fn enable_mic(&self, enabled: bool);

    /// Whether the local microphone is on
    fn is_mic_enabled(&self) -> bool;

    /// Join a session with the remote agent
    ///
    /// Resolves once the media session is joined; the agent becoming ready is
    /// reported later through the state.
    async fn start(&self) -> Result<(), TransportError>;

    /// Tear the session down
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Devices discovered by `init_devices`
    fn devices(&self) -> MediaDevices;

    /// Switch to another microphone
    fn update_mic(&self, name: &str) -> Result<(), TransportError>;

    /// Switch to another speaker
    fn update_speaker(&self, name: &str) -> Result<(), TransportError>;
}
