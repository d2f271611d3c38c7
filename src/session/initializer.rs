//! Device initialization trigger

use crate::transport::TransportState;

/// Decides when to ask the transport to set up local devices
///
/// Fires whenever the observed transport state changes to `idle`, including
/// the very first observation. A transport leaves `idle` for good once
/// initialization starts, so in practice this fires once per worker.
#[derive(Debug, Default)]
pub struct DeviceInitializer {
    last_seen: Option<TransportState>,
    requests: u32,
}

impl DeviceInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an observed state; returns true when init should be requested
    pub fn observe(&mut self, state: TransportState) -> bool {
        let changed = self.last_seen != Some(state);
        self.last_seen = Some(state);
        if changed && state == TransportState::Idle {
            self.requests += 1;
            true
        } else {
            false
        }
    }

    /// How many times init has been requested
    pub fn requests(&self) -> u32 {
        self.requests
    }
}
