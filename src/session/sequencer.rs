//! Connection sequencing: start with bounded retries, watchdog, leave
//!
//! A start attempt arms a watchdog, mutes the microphone and asks the
//! transport to join. Generic failures are retried up to [`MAX_RETRIES`]
//! times; a rate-limit signal is terminal straight away. Each attempt gets
//! its own watchdog, which is never cancelled: when it fires it reads the
//! live transport state and tears the session down if the agent is not
//! ready. Once an error is showing no further attempt is made, and a start
//! that completes behind the error is disconnected again.

use crate::error::{DemoError, Result};
use crate::state::{SessionEvent, SharedSessionState, MAX_RETRIES};
use crate::transport::{TransportState, VoiceTransport};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Drives session start and teardown against a transport
pub struct ConnectionSequencer<T: VoiceTransport> {
    transport: Arc<T>,
    state: SharedSessionState,
    event_tx: Sender<SessionEvent>,
    watchdog_timeout: Duration,
}

impl<T: VoiceTransport> ConnectionSequencer<T> {
    /// Create a sequencer
    ///
    /// `watchdog_timeout` is the full deadline, i.e. already the extended
    /// (doubled) bot-ready timeout.
    pub fn new(
        transport: Arc<T>,
        state: SharedSessionState,
        event_tx: Sender<SessionEvent>,
        watchdog_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            state,
            event_tx,
            watchdog_timeout,
        }
    }

    /// The transport being driven
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Start a session, retrying generic failures
    ///
    /// Rejected with [`DemoError::NotReady`] unless the session is ready, no
    /// error is showing and no other start is in flight. Terminal failures
    /// are stored in the shared state before being returned.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            if !state.can_start() {
                let app = state.app_state();
                debug!(
                    "Ignoring start request (app state: {}, starting: {}, error: {})",
                    app,
                    state.starting,
                    state.has_error()
                );
                return Err(DemoError::NotReady(app));
            }
            state.starting = true;
        }

        let result = self.run_attempts().await;
        self.state.write().starting = false;
        result
    }

    async fn run_attempts(&self) -> Result<()> {
        loop {
            self.arm_watchdog();

            // Mic stays off until the agent has joined
            self.transport.enable_mic(false);
            self.state.write().mic_enabled = false;

            info!("Starting voice session...");
            let result = self.transport.start().await;
            let error_showing = self.state.read().has_error();
            let error = match result {
                Ok(()) if error_showing => {
                    // A watchdog gave up on this start while it was running
                    let live = self.transport.state();
                    warn!("Session joined after an error was shown, disconnecting");
                    if let Err(e) = self.transport.disconnect().await {
                        warn!("Disconnect of late session failed: {}", e);
                    }
                    return Err(DemoError::WatchdogTimeout { state: live });
                }
                Ok(()) => {
                    self.state.write().retry_count = 0;
                    info!("Voice session started");
                    emit(&self.event_tx, SessionEvent::Started);
                    return Ok(());
                }
                Err(e) => e,
            };

            error!("Error starting voice session: {}", error);
            if error.is_rate_limited() {
                return Err(self.fail(DemoError::RateLimited(error.to_string())));
            }
            if error_showing {
                info!("Error already showing, not retrying");
                return Err(DemoError::Transport(error));
            }

            let retry = {
                let mut state = self.state.write();
                if state.retry_count < MAX_RETRIES {
                    state.retry_count += 1;
                    Some(state.retry_count)
                } else {
                    None
                }
            };

            match retry {
                Some(attempt) => {
                    info!("Retrying... ({}/{})", attempt, MAX_RETRIES);
                    emit(
                        &self.event_tx,
                        SessionEvent::Retrying {
                            attempt,
                            max: MAX_RETRIES,
                        },
                    );
                }
                None => {
                    return Err(self.fail(DemoError::RetriesExhausted {
                        attempts: MAX_RETRIES + 1,
                    }));
                }
            }
        }
    }

    /// Schedule a readiness check after the watchdog deadline
    ///
    /// The returned handle is only for observation; nothing cancels it.
    pub fn arm_watchdog(&self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let state = self.state.clone();
        let event_tx = self.event_tx.clone();
        let timeout = self.watchdog_timeout;

        debug!("Watchdog armed for {:?}", timeout);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            check_ready(transport.as_ref(), &state, &event_tx).await;
        })
    }

    /// Disconnect, then request a reload
    ///
    /// The reload is requested even when the disconnect fails. The request is
    /// recorded in the shared state; the event only wakes the UI up.
    pub async fn leave(&self) -> Result<()> {
        info!("Leaving session...");
        let result = self.transport.disconnect().await;
        if let Err(e) = &result {
            warn!("Disconnect failed while leaving: {}", e);
        }
        self.state.write().reload_requested = true;
        emit(&self.event_tx, SessionEvent::ReloadRequested);
        result.map_err(DemoError::from)
    }

    fn fail(&self, error: DemoError) -> DemoError {
        record_failure(&self.state, &self.event_tx, &error);
        error
    }
}

/// Watchdog body: act only if the live transport state is not `ready`
///
/// The error is only recorded if none is showing yet, but the disconnect
/// happens on every trip unless teardown is already under way.
async fn check_ready<T: VoiceTransport>(
    transport: &T,
    state: &SharedSessionState,
    event_tx: &Sender<SessionEvent>,
) {
    let live = transport.state();
    match live {
        TransportState::Ready => {
            debug!("Watchdog fired, agent is ready");
            return;
        }
        TransportState::Disconnecting | TransportState::Disconnected => {
            debug!("Watchdog fired, session already torn down ({})", live);
            return;
        }
        _ => {}
    }

    warn!("Watchdog fired before agent was ready (state: {})", live);
    record_failure(state, event_tx, &DemoError::WatchdogTimeout { state: live });

    if let Err(e) = transport.disconnect().await {
        warn!("Disconnect after watchdog failed: {}", e);
    }
}

fn record_failure(state: &SharedSessionState, event_tx: &Sender<SessionEvent>, error: &DemoError) {
    if state.write().fail(error) {
        emit(event_tx, SessionEvent::Failed(error.clone()));
    } else {
        debug!("Error already showing, not replacing it with: {}", error);
    }
}

pub(crate) fn emit(event_tx: &Sender<SessionEvent>, event: SessionEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => warn!("Event channel full, dropping {:?}", event),
        Err(TrySendError::Disconnected(_)) => debug!("Event channel closed"),
    }
}
