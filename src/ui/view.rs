//! View selection and user actions
//!
//! Which screen to show is decided purely from a [`SessionSnapshot`]:
//! an error always wins, then an active session, then the configuration
//! card.

use crate::state::{SessionCommand, SessionSnapshot};
use crate::transport::TransportState;

/// Screen to render
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActiveView {
    /// Terminal error banner
    Error(String),
    /// Live session
    Session,
    /// Device configuration and the start control
    Configure,
}

impl ActiveView {
    /// Pick the screen for a snapshot
    pub fn select(snapshot: &SessionSnapshot) -> Self {
        if let Some(message) = &snapshot.error {
            ActiveView::Error(message.clone())
        } else if snapshot.app.is_connected() {
            ActiveView::Session
        } else {
            ActiveView::Configure
        }
    }
}

/// Label for the start control
pub fn status_text(state: TransportState) -> &'static str {
    match state {
        TransportState::Idle | TransportState::Initializing => "Initializing...",
        TransportState::Initialized => "Start",
        TransportState::Handshaking => "Requesting agent...",
        TransportState::Connecting => "Connecting...",
        TransportState::Connected | TransportState::Ready => "Connected",
        TransportState::Disconnecting => "Disconnecting...",
        TransportState::Disconnected => "Disconnected",
        TransportState::Error => "Unavailable",
    }
}

/// Start control label, accounting for a start that is being retried
///
/// Between attempts the transport falls back to `initialized`, which would
/// otherwise read "Start" while the control is busy.
pub fn start_label(snapshot: &SessionSnapshot) -> &'static str {
    if snapshot.starting && snapshot.transport == TransportState::Initialized {
        "Retrying..."
    } else {
        status_text(snapshot.transport)
    }
}

/// Something the user did in a view
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiAction {
    Start,
    SetStartAudioOff(bool),
    SelectMic(String),
    SelectSpeaker(String),
    SetMic(bool),
    Leave,
}

impl UiAction {
    /// Worker command carrying out this action
    pub fn into_command(self) -> SessionCommand {
        match self {
            UiAction::Start => SessionCommand::Start,
            UiAction::SetStartAudioOff(off) => SessionCommand::SetStartAudioOff(off),
            UiAction::SelectMic(name) => SessionCommand::SelectMic(name),
            UiAction::SelectSpeaker(name) => SessionCommand::SelectSpeaker(name),
            UiAction::SetMic(enabled) => SessionCommand::EnableMic(enabled),
            UiAction::Leave => SessionCommand::Leave,
        }
    }
}
