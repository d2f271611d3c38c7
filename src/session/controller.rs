//! Session worker
//!
//! Runs the connection sequencer on a dedicated thread with a single-threaded
//! tokio runtime. Commands from the UI are handled strictly one after another,
//! so a start sequence (including its retries) is never overlapped by another
//! transport operation issued from here. A follower task mirrors transport
//! state changes into the shared state and triggers device initialization.
//!
//! Shutting the worker down drops its runtime, which also drops pending
//! watchdogs and any in-flight command.

use crate::config::DemoConfig;
use crate::error::{DemoError, Result};
use crate::session::initializer::DeviceInitializer;
use crate::session::sequencer::{emit, ConnectionSequencer};
use crate::state::{SessionCommand, SessionEvent, SessionSnapshot, SharedSessionState};
use crate::transport::{TransportState, VoiceTransport};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Builds and starts a session worker for one transport
pub struct SessionController<T: VoiceTransport> {
    transport: Arc<T>,
    watchdog_timeout: Duration,
    channel_buffer_size: usize,
}

impl<T: VoiceTransport> SessionController<T> {
    /// Create a controller using the timeouts from `config`
    pub fn new(transport: T, config: &DemoConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            watchdog_timeout: config.extended_timeout(),
            channel_buffer_size: 100,
        }
    }

    /// Shared access to the transport
    pub fn transport(&self) -> Arc<T> {
        Arc::clone(&self.transport)
    }

    /// Start the worker thread
    ///
    /// Returns a handle for sending commands, receiving events and reading
    /// state.
    pub fn start_worker(self) -> Result<SessionHandle> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = bounded(self.channel_buffer_size);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = SharedSessionState::new();
        state
            .write()
            .set_transport_state(self.transport.state());

        let sequencer = ConnectionSequencer::new(
            self.transport,
            state.clone(),
            event_tx.clone(),
            self.watchdog_timeout,
        );
        let worker_state = state.clone();

        let worker_handle = thread::Builder::new()
            .name("session-worker".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime: {}", e);
                        emit(
                            &event_tx,
                            SessionEvent::Failed(DemoError::RuntimeError(e.to_string())),
                        );
                        return;
                    }
                };

                runtime.block_on(worker_loop(
                    sequencer,
                    command_rx,
                    shutdown_rx,
                    event_tx,
                    worker_state,
                ));
                runtime.shutdown_timeout(Duration::from_millis(500));
            })?;

        Ok(SessionHandle {
            command_tx,
            event_rx,
            state,
            shutdown_tx: Some(shutdown_tx),
            worker_handle: Some(worker_handle),
        })
    }
}

/// Handle for controlling a session worker from the UI or tests
pub struct SessionHandle {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    event_rx: Receiver<SessionEvent>,
    state: SharedSessionState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker_handle: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Send a command to the worker
    pub fn send_command(&self, cmd: SessionCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| DemoError::ChannelError(format!("Failed to send command: {}", e)))
    }

    /// Press Start
    pub fn start(&self) -> Result<()> {
        self.send_command(SessionCommand::Start)
    }

    /// Leave the session (disconnect, then reload)
    pub fn leave(&self) -> Result<()> {
        self.send_command(SessionCommand::Leave)
    }

    /// Turn the microphone on or off
    pub fn enable_mic(&self, enabled: bool) -> Result<()> {
        self.send_command(SessionCommand::EnableMic(enabled))
    }

    /// Set the "start with audio off" preference
    pub fn set_start_audio_off(&self, off: bool) -> Result<()> {
        self.send_command(SessionCommand::SetStartAudioOff(off))
    }

    /// Try to receive an event
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for an event
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Drain every pending event
    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Shared session state
    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    /// Snapshot of the session state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    /// Stop the worker and wait for its thread to exit
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.worker_handle.take() {
            if handle.join().is_err() {
                error!("Session worker panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn worker_loop<T: VoiceTransport>(
    sequencer: ConnectionSequencer<T>,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    shutdown_rx: oneshot::Receiver<()>,
    event_tx: Sender<SessionEvent>,
    state: SharedSessionState,
) {
    info!("Session worker started");

    let follower = tokio::spawn(follow_transport(
        Arc::clone(sequencer.transport()),
        state.clone(),
        event_tx.clone(),
    ));

    tokio::select! {
        _ = shutdown_rx => {
            info!("Session worker shutdown requested");
        }
        _ = handle_commands(&sequencer, &mut command_rx, &state) => {}
    }

    follower.abort();
    emit(&event_tx, SessionEvent::Shutdown);
    info!("Session worker stopped");
}

async fn handle_commands<T: VoiceTransport>(
    sequencer: &ConnectionSequencer<T>,
    command_rx: &mut mpsc::UnboundedReceiver<SessionCommand>,
    state: &SharedSessionState,
) {
    let transport = sequencer.transport();

    while let Some(command) = command_rx.recv().await {
        debug!("Session command: {:?}", command);
        match command {
            SessionCommand::Start => {
                if let Err(e) = sequencer.start().await {
                    if e.is_recoverable() {
                        debug!("Start not performed: {}", e);
                    } else {
                        warn!("Session start failed: {}", e);
                    }
                }
            }
            SessionCommand::SetStartAudioOff(off) => {
                state.write().start_audio_off = off;
            }
            SessionCommand::EnableMic(enabled) => {
                transport.enable_mic(enabled);
                state.write().mic_enabled = enabled;
            }
            SessionCommand::SelectMic(name) => match transport.update_mic(&name) {
                Ok(()) => state.write().devices = transport.devices(),
                Err(e) => warn!("Failed to switch microphone: {}", e),
            },
            SessionCommand::SelectSpeaker(name) => match transport.update_speaker(&name) {
                Ok(()) => state.write().devices = transport.devices(),
                Err(e) => warn!("Failed to switch speaker: {}", e),
            },
            SessionCommand::Leave => {
                if let Err(e) = sequencer.leave().await {
                    warn!("Leave finished with error: {}", e);
                }
            }
            SessionCommand::Shutdown => {
                info!("Shutdown command received");
                break;
            }
        }
    }
}

/// Mirror transport state into the shared state
async fn follow_transport<T: VoiceTransport>(
    transport: Arc<T>,
    state: SharedSessionState,
    event_tx: Sender<SessionEvent>,
) {
    let mut state_rx = transport.subscribe();
    let mut initializer = DeviceInitializer::new();
    let mut agent_ready_seen = false;

    loop {
        let current = *state_rx.borrow_and_update();
        let start_audio_off = {
            let mut state = state.write();
            state.set_transport_state(current);
            state.start_audio_off
        };
        emit(&event_tx, SessionEvent::StateChanged(current));

        if initializer.observe(current) {
            let transport = Arc::clone(&transport);
            let state = state.clone();
            tokio::spawn(async move {
                info!("Initializing devices...");
                match transport.init_devices().await {
                    Ok(()) => state.write().devices = transport.devices(),
                    Err(e) => warn!("Device initialization failed: {}", e),
                }
            });
        }

        if current == TransportState::Ready && !agent_ready_seen {
            agent_ready_seen = true;
            if start_audio_off {
                info!("Agent ready, microphone left off");
            } else {
                transport.enable_mic(true);
                state.write().mic_enabled = true;
                info!("Agent ready, microphone enabled");
            }
        }

        if state_rx.changed().await.is_err() {
            debug!("Transport state channel closed");
            break;
        }
    }
}
