//! Local simulated transport
//!
//! Walks through the same lifecycle a real voice transport reports, with
//! configurable per-phase delays and injectable failures. Used by the demo
//! binary when no agent service is available, and by the tests.

use super::{MediaDevices, TransportError, TransportState, VoiceTransport};
use crate::devices;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Behaviour of the simulated transport
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time spent in `initializing`
    pub init_delay_ms: u64,
    /// Time spent in `handshaking` before the outcome of a start is known
    pub handshake_delay_ms: u64,
    /// Time spent in `connecting`
    pub connect_delay_ms: u64,
    /// Time from `connected` until the agent reports ready
    pub bot_ready_delay_ms: u64,
    /// Time spent in `disconnecting`
    pub disconnect_delay_ms: u64,
    /// Number of generic start failures before a start succeeds
    pub fail_starts: u32,
    /// Reject every start with the rate-limit signal
    pub rate_limited: bool,
    /// Whether the agent ever becomes ready after joining
    pub bot_joins: bool,
    /// Query the audio host for real devices during init
    pub discover_devices: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            init_delay_ms: 300,
            handshake_delay_ms: 600,
            connect_delay_ms: 400,
            bot_ready_delay_ms: 1500,
            disconnect_delay_ms: 200,
            fail_starts: 0,
            rate_limited: false,
            bot_joins: true,
            discover_devices: true,
        }
    }
}

impl SimulationConfig {
    /// No delays and no device discovery
    pub fn instant() -> Self {
        Self {
            init_delay_ms: 0,
            handshake_delay_ms: 0,
            connect_delay_ms: 0,
            bot_ready_delay_ms: 0,
            disconnect_delay_ms: 0,
            discover_devices: false,
            ..Self::default()
        }
    }

    /// Fail the first `count` starts with a generic error
    pub fn with_failed_starts(mut self, count: u32) -> Self {
        self.fail_starts = count;
        self
    }

    /// Reject starts with the rate-limit signal
    pub fn rate_limited(mut self) -> Self {
        self.rate_limited = true;
        self
    }

    /// Never let the agent become ready
    pub fn without_bot(mut self) -> Self {
        self.bot_joins = false;
        self
    }

    /// Set how long a start waits before its outcome is known
    pub fn with_handshake_delay_ms(mut self, delay: u64) -> Self {
        self.handshake_delay_ms = delay;
        self
    }

    /// Set the agent join delay
    pub fn with_bot_ready_delay_ms(mut self, delay: u64) -> Self {
        self.bot_ready_delay_ms = delay;
        self
    }

    /// Set the teardown delay
    pub fn with_disconnect_delay_ms(mut self, delay: u64) -> Self {
        self.disconnect_delay_ms = delay;
        self
    }
}

/// A call made on the transport, in the order received
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCall {
    InitDevices,
    EnableMic(bool),
    Start,
    Disconnect,
    UpdateMic(String),
    UpdateSpeaker(String),
}

struct Inner {
    mic_enabled: bool,
    devices: MediaDevices,
    failed_starts: u32,
    calls: Vec<TransportCall>,
    bot_task: Option<JoinHandle<()>>,
}

/// Transport that simulates an agent service in-process
pub struct SimulatedTransport {
    config: SimulationConfig,
    endpoint: String,
    state_tx: Arc<watch::Sender<TransportState>>,
    inner: Mutex<Inner>,
}

impl SimulatedTransport {
    /// Create a simulated transport in the `idle` state
    pub fn new(config: SimulationConfig) -> Self {
        let (state_tx, _) = watch::channel(TransportState::Idle);
        Self {
            config,
            endpoint: "simulated".to_string(),
            state_tx: Arc::new(state_tx),
            inner: Mutex::new(Inner {
                mic_enabled: true,
                devices: MediaDevices::default(),
                failed_starts: 0,
                calls: Vec::new(),
                bot_task: None,
            }),
        }
    }

    /// Set the agent endpoint reported in logs
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<TransportCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of `start` calls received
    pub fn start_calls(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Start))
    }

    /// Number of `disconnect` calls received
    pub fn disconnect_calls(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Disconnect))
    }

    /// Number of `init_devices` calls received
    pub fn init_calls(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::InitDevices))
    }

    fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: TransportCall) {
        self.inner.lock().calls.push(call);
    }

    fn set_state(&self, state: TransportState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Transport state: {} -> {}", previous, state);
        }
    }

    fn abort_bot(&self) {
        if let Some(task) = self.inner.lock().bot_task.take() {
            task.abort();
        }
    }

    fn spawn_bot(&self) {
        let state_tx = Arc::clone(&self.state_tx);
        let delay = self.config.bot_ready_delay_ms;
        let task = tokio::spawn(async move {
            pause(delay).await;
            let joined = state_tx.send_if_modified(|state| {
                if *state == TransportState::Connected {
                    *state = TransportState::Ready;
                    true
                } else {
                    false
                }
            });
            if joined {
                debug!("Simulated agent is ready");
            }
        });
        if let Some(previous) = self.inner.lock().bot_task.replace(task) {
            previous.abort();
        }
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl VoiceTransport for SimulatedTransport {
    fn state(&self) -> TransportState {
        *self.state_tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<TransportState> {
        self.state_tx.subscribe()
    }

    async fn init_devices(&self) -> Result<(), TransportError> {
        self.record(TransportCall::InitDevices);
        self.set_state(TransportState::Initializing);
        pause(self.config.init_delay_ms).await;

        let devices = if self.config.discover_devices {
            tokio::task::spawn_blocking(devices::discover)
                .await
                .map_err(|e| TransportError::Device(format!("Device discovery failed: {}", e)))?
        } else {
            MediaDevices::with_defaults(
                vec![super::AudioDeviceInfo {
                    name: devices::SYSTEM_DEFAULT_DEVICE.to_string(),
                    is_default: true,
                }],
                vec![super::AudioDeviceInfo {
                    name: devices::SYSTEM_DEFAULT_DEVICE.to_string(),
                    is_default: true,
                }],
            )
        };
        info!(
            "Devices initialized: {} mic(s), {} speaker(s)",
            devices.mics.len(),
            devices.speakers.len()
        );
        self.inner.lock().devices = devices;
        self.set_state(TransportState::Initialized);
        Ok(())
    }

    fn enable_mic(&self, enabled: bool) {
        let mut inner = self.inner.lock();
        inner.calls.push(TransportCall::EnableMic(enabled));
        inner.mic_enabled = enabled;
    }

    fn is_mic_enabled(&self) -> bool {
        self.inner.lock().mic_enabled
    }

    async fn start(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Start);
        info!("Requesting agent from {}", self.endpoint);
        self.set_state(TransportState::Handshaking);
        pause(self.config.handshake_delay_ms).await;

        if self.config.rate_limited {
            self.set_state(TransportState::Initialized);
            return Err(TransportError::RateLimited(
                "simulated service is at capacity".to_string(),
            ));
        }

        let failure = {
            let mut inner = self.inner.lock();
            if inner.failed_starts < self.config.fail_starts {
                inner.failed_starts += 1;
                Some(inner.failed_starts)
            } else {
                None
            }
        };
        if let Some(n) = failure {
            warn!("Simulated start failure {}", n);
            self.set_state(TransportState::Initialized);
            return Err(TransportError::StartFailed(format!(
                "simulated start failure {}",
                n
            )));
        }

        self.set_state(TransportState::Connecting);
        pause(self.config.connect_delay_ms).await;
        self.set_state(TransportState::Connected);

        if self.config.bot_joins {
            self.spawn_bot();
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Disconnect);
        self.abort_bot();
        self.set_state(TransportState::Disconnecting);
        pause(self.config.disconnect_delay_ms).await;
        self.inner.lock().mic_enabled = false;
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    fn devices(&self) -> MediaDevices {
        self.inner.lock().devices.clone()
    }

    fn update_mic(&self, name: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TransportCall::UpdateMic(name.to_string()));
        if !inner.devices.has_mic(name) {
            return Err(TransportError::Device(format!("Unknown microphone: {}", name)));
        }
        inner.devices.selected_mic = Some(name.to_string());
        Ok(())
    }

    fn update_speaker(&self, name: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TransportCall::UpdateSpeaker(name.to_string()));
        if !inner.devices.has_speaker(name) {
            return Err(TransportError::Device(format!("Unknown speaker: {}", name)));
        }
        inner.devices.selected_speaker = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle() {
        let transport = SimulatedTransport::new(SimulationConfig::instant());
        assert_eq!(transport.state(), TransportState::Idle);

        transport.init_devices().await.unwrap();
        assert_eq!(transport.state(), TransportState::Initialized);
        assert!(transport.devices().selected_mic.is_some());

        transport.start().await.unwrap();
        assert_eq!(transport.state(), TransportState::Connected);

        transport.disconnect().await.unwrap();
        assert_eq!(transport.state(), TransportState::Disconnected);
        assert!(!transport.is_mic_enabled());
    }

    #[tokio::test]
    async fn test_injected_failures_then_success() {
        let transport = SimulatedTransport::new(SimulationConfig::instant().with_failed_starts(2));
        transport.init_devices().await.unwrap();

        assert!(matches!(
            transport.start().await,
            Err(TransportError::StartFailed(_))
        ));
        assert_eq!(transport.state(), TransportState::Initialized);
        assert!(transport.start().await.is_err());
        assert!(transport.start().await.is_ok());
        assert_eq!(transport.start_calls(), 3);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let transport = SimulatedTransport::new(SimulationConfig::instant().rate_limited());
        let err = transport.start().await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_becomes_ready() {
        let transport =
            SimulatedTransport::new(SimulationConfig::instant().with_bot_ready_delay_ms(1000));
        let mut rx = transport.subscribe();
        transport.start().await.unwrap();
        assert_eq!(transport.state(), TransportState::Connected);

        rx.wait_for(|s| *s == TransportState::Ready).await.unwrap();
        assert_eq!(transport.state(), TransportState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_bot_join() {
        let transport =
            SimulatedTransport::new(SimulationConfig::instant().with_bot_ready_delay_ms(1000));
        transport.start().await.unwrap();
        transport.disconnect().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(transport.state(), TransportState::Disconnected);
    }

    #[tokio::test]
    async fn test_device_selection() {
        let transport = SimulatedTransport::new(SimulationConfig::instant());
        transport.init_devices().await.unwrap();

        assert!(transport.update_mic(devices::SYSTEM_DEFAULT_DEVICE).is_ok());
        assert!(matches!(
            transport.update_speaker("Nonexistent"),
            Err(TransportError::Device(_))
        ));
        assert_eq!(
            transport.calls().last(),
            Some(&TransportCall::UpdateSpeaker("Nonexistent".to_string()))
        );
    }
}
