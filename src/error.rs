//! Error types for the voice demo
//!
//! One crate-wide error enum, with helpers for deciding whether a failure is
//! worth retrying and for producing the text shown in the error banner.

use crate::state::AppState;
use crate::transport::{TransportError, TransportState};
use thiserror::Error;

/// Voice demo errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DemoError {
    /// The transport refused the session because the service is saturated
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Every start attempt failed with a generic error
    #[error("Session start failed after {attempts} attempts")]
    RetriesExhausted {
        /// Total number of start attempts made (initial try plus retries)
        attempts: u32,
    },

    /// The agent did not reach the ready state before the watchdog deadline
    #[error("Bot not ready before deadline (transport state: {state})")]
    WatchdogTimeout {
        /// Live transport state when the watchdog fired
        state: TransportState,
    },

    /// Transport operation error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A start was requested while the session could not accept one
    #[error("Not ready to start (app state: {0})")]
    NotReady(AppState),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),

    /// Channel communication error
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Async runtime could not be created
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl From<std::io::Error> for DemoError {
    fn from(e: std::io::Error) -> Self {
        DemoError::IOError(e.to_string())
    }
}

impl DemoError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the session usable. Everything else ends up
    /// in the error banner, which only a reload clears.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Capacity and deadline failures are terminal for this session
            DemoError::RateLimited(_) => false,
            DemoError::RetriesExhausted { .. } => false,
            DemoError::WatchdogTimeout { .. } => false,
            // A single transport failure is retried by the sequencer
            DemoError::Transport(e) => !e.is_rate_limited(),
            // Start was simply pressed at the wrong moment
            DemoError::NotReady(_) => true,
            DemoError::ConfigError(_) => false,
            DemoError::IOError(_) => false,
            DemoError::ChannelError(_) => false,
            DemoError::RuntimeError(_) => false,
        }
    }

    /// Get a user-friendly description of the error
    ///
    /// Returns a message suitable for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            DemoError::RateLimited(_) => {
                "Demo is currently at capacity. Please try again later.".to_string()
            }
            DemoError::RetriesExhausted { .. } => {
                "Unable to authenticate. Server may be offline or busy. Please try again later."
                    .to_string()
            }
            DemoError::WatchdogTimeout { .. } => {
                "Bot failed to join or enter ready state. Server may be busy. Please try again later."
                    .to_string()
            }
            DemoError::Transport(_) => {
                "Connection to the agent failed. Please try again.".to_string()
            }
            DemoError::NotReady(_) => "Not ready to start yet.".to_string(),
            DemoError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            DemoError::IOError(_) => "File system error occurred.".to_string(),
            DemoError::ChannelError(_) | DemoError::RuntimeError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

/// Result type alias for voice demo operations
pub type Result<T> = std::result::Result<T, DemoError>;
