//! Session lifecycle tests
//!
//! The sequencer tests run on a paused tokio clock so watchdog deadlines can
//! be reached instantly. The worker tests drive a real session worker thread
//! through its handle, the same way the UI does.

use crossbeam_channel::{bounded, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use voice_demo::session::{ConnectionSequencer, SessionController, SessionHandle};
use voice_demo::state::SharedSessionState;
use voice_demo::transport::TransportCall;
use voice_demo::{
    DemoConfig, DemoError, SessionEvent, SessionSnapshot, SimulatedTransport, SimulationConfig,
    TransportState, VoiceTransport,
};

const WATCHDOG: Duration = Duration::from_secs(30);

const AT_CAPACITY: &str = "Demo is currently at capacity. Please try again later.";
const UNABLE_TO_AUTHENTICATE: &str =
    "Unable to authenticate. Server may be offline or busy. Please try again later.";
const BOT_FAILED: &str =
    "Bot failed to join or enter ready state. Server may be busy. Please try again later.";

struct Fixture {
    sequencer: ConnectionSequencer<SimulatedTransport>,
    transport: Arc<SimulatedTransport>,
    state: SharedSessionState,
    events: Receiver<SessionEvent>,
}

/// Sequencer over an initialized simulated transport
async fn fixture(config: SimulationConfig) -> Fixture {
    let transport = Arc::new(SimulatedTransport::new(config));
    transport.init_devices().await.unwrap();

    let state = SharedSessionState::new();
    state.write().set_transport_state(transport.state());

    let (tx, events) = bounded(100);
    let sequencer = ConnectionSequencer::new(Arc::clone(&transport), state.clone(), tx, WATCHDOG);
    Fixture {
        sequencer,
        transport,
        state,
        events,
    }
}

fn retry_attempts(events: &Receiver<SessionEvent>) -> Vec<u32> {
    events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::Retrying { attempt, .. } => Some(attempt),
            _ => None,
        })
        .collect()
}

async fn past_watchdog() {
    tokio::time::sleep(WATCHDOG + Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_three_failures_then_success() {
    let f = fixture(
        SimulationConfig::instant()
            .with_failed_starts(3)
            .with_bot_ready_delay_ms(500),
    )
    .await;

    f.sequencer.start().await.unwrap();

    assert_eq!(retry_attempts(&f.events), vec![1, 2, 3]);
    assert_eq!(f.state.retry_count(), 0);
    assert_eq!(f.transport.start_calls(), 4);
    assert!(f.state.error().is_none());

    // Every attempt armed a watchdog; none of them may fire once the agent is ready
    past_watchdog().await;
    assert_eq!(f.transport.state(), TransportState::Ready);
    assert!(f.state.error().is_none());
    assert_eq!(f.transport.disconnect_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted() {
    let f = fixture(SimulationConfig::instant().with_failed_starts(10)).await;

    let err = f.sequencer.start().await.unwrap_err();

    assert_eq!(err, DemoError::RetriesExhausted { attempts: 4 });
    assert_eq!(f.transport.start_calls(), 4);
    assert_eq!(retry_attempts(&f.events), vec![1, 2, 3]);
    assert_eq!(f.state.error().as_deref(), Some(UNABLE_TO_AUTHENTICATE));

    // The watchdogs still fire later, but the first error stays on screen
    past_watchdog().await;
    assert_eq!(f.state.error().as_deref(), Some(UNABLE_TO_AUTHENTICATE));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_is_terminal() {
    let f = fixture(SimulationConfig::instant().rate_limited()).await;

    let err = f.sequencer.start().await.unwrap_err();

    assert!(matches!(err, DemoError::RateLimited(_)));
    assert_eq!(f.transport.start_calls(), 1);
    assert_eq!(f.state.retry_count(), 0);
    assert!(retry_attempts(&f.events).is_empty());
    assert_eq!(f.state.error().as_deref(), Some(AT_CAPACITY));
}

#[tokio::test(start_paused = true)]
async fn test_start_ignored_after_error() {
    let f = fixture(SimulationConfig::instant().rate_limited()).await;
    f.sequencer.start().await.unwrap_err();

    let err = f.sequencer.start().await.unwrap_err();
    assert!(matches!(err, DemoError::NotReady(_)));
    assert_eq!(f.transport.start_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_fires_when_agent_never_joins() {
    let f = fixture(SimulationConfig::instant().without_bot()).await;

    f.sequencer.start().await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Connected);

    past_watchdog().await;

    assert_eq!(f.state.error().as_deref(), Some(BOT_FAILED));
    assert_eq!(f.transport.disconnect_calls(), 1);
    assert_eq!(f.transport.state(), TransportState::Disconnected);
    assert!(f
        .events
        .try_iter()
        .any(|e| matches!(e, SessionEvent::Failed(DemoError::WatchdogTimeout { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_no_retry_after_watchdog_during_slow_start() {
    let f = fixture(
        SimulationConfig::instant()
            .with_handshake_delay_ms(31_000)
            .with_failed_starts(1)
            .without_bot(),
    )
    .await;

    let result = f.sequencer.start().await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(result.is_err());
    assert_eq!(f.transport.start_calls(), 1);
    assert!(retry_attempts(&f.events).is_empty());
    assert_ne!(f.transport.state(), TransportState::Connected);
    assert_eq!(f.state.error().as_deref(), Some(BOT_FAILED));
}

#[tokio::test(start_paused = true)]
async fn test_late_join_behind_watchdog_error_is_torn_down() {
    let f = fixture(
        SimulationConfig::instant()
            .with_handshake_delay_ms(31_000)
            .without_bot(),
    )
    .await;

    let err = f.sequencer.start().await.unwrap_err();
    assert!(matches!(err, DemoError::WatchdogTimeout { .. }));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(f.transport.state(), TransportState::Disconnected);
    assert_eq!(f.transport.disconnect_calls(), 2);
    assert_eq!(f.state.error().as_deref(), Some(BOT_FAILED));
    assert!(!f
        .events
        .try_iter()
        .any(|e| e == SessionEvent::Started));
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_watchdogs_disconnect_once() {
    let f = fixture(SimulationConfig::instant().with_failed_starts(10)).await;

    f.sequencer.start().await.unwrap_err();
    past_watchdog().await;

    // Four attempts armed four watchdogs; only the first finds a live session
    assert_eq!(f.transport.disconnect_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_quiet_when_agent_ready() {
    let f = fixture(SimulationConfig::instant()).await;

    f.sequencer.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(f.transport.state(), TransportState::Ready);

    past_watchdog().await;

    assert!(f.state.error().is_none());
    assert_eq!(f.transport.disconnect_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_before_deadline_does_nothing() {
    let f = fixture(SimulationConfig::instant().without_bot()).await;

    f.sequencer.start().await.unwrap();
    tokio::time::sleep(WATCHDOG - Duration::from_secs(1)).await;

    assert!(f.state.error().is_none());
    assert_eq!(f.transport.disconnect_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reload_only_after_disconnect() {
    let f = fixture(SimulationConfig::instant().with_disconnect_delay_ms(1000)).await;
    f.sequencer.start().await.unwrap();
    f.events.try_iter().for_each(drop);

    let leave = f.sequencer.leave();
    tokio::pin!(leave);

    tokio::select! {
        _ = &mut leave => panic!("leave finished before the disconnect did"),
        _ = tokio::time::sleep(Duration::from_millis(500)) => {}
    }
    assert_eq!(f.transport.state(), TransportState::Disconnecting);
    assert!(!f.state.is_reload_requested());
    assert!(!f
        .events
        .try_iter()
        .any(|e| e == SessionEvent::ReloadRequested));

    leave.await.unwrap();
    assert_eq!(f.transport.state(), TransportState::Disconnected);
    assert!(f.state.is_reload_requested());
    assert!(f
        .events
        .try_iter()
        .any(|e| e == SessionEvent::ReloadRequested));
    assert_eq!(
        f.transport.calls().last(),
        Some(&TransportCall::Disconnect)
    );
}

// Session worker

fn instant_config() -> DemoConfig {
    DemoConfig::default()
        .with_bot_ready_timeout(Duration::from_secs(5))
        .with_simulation(SimulationConfig::instant())
}

fn start_worker(config: &DemoConfig) -> (SessionHandle, Arc<SimulatedTransport>) {
    let controller =
        SessionController::new(SimulatedTransport::new(config.simulation.clone()), config);
    let transport = controller.transport();
    (controller.start_worker().unwrap(), transport)
}

/// Pump events until the snapshot satisfies `pred`; collects what was seen
fn wait_until(
    handle: &SessionHandle,
    seen: &mut Vec<SessionEvent>,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = handle.snapshot();
        if pred(&snapshot) {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting, last snapshot: {:?}",
            snapshot
        );
        if let Some(event) = handle.recv_event_timeout(Duration::from_millis(50)) {
            seen.push(event);
        }
    }
}

#[test]
fn test_worker_initializes_devices() {
    let (mut handle, transport) = start_worker(&instant_config());
    let mut seen = Vec::new();

    let snapshot = wait_until(&handle, &mut seen, |s| s.transport == TransportState::Initialized);
    assert!(snapshot.can_start());

    let snapshot = wait_until(&handle, &mut seen, |s| s.devices.selected_mic.is_some());
    assert!(snapshot.devices.selected_speaker.is_some());
    assert_eq!(transport.init_calls(), 1);

    handle.shutdown();
}

#[test]
fn test_worker_session_round_trip() {
    let (mut handle, transport) = start_worker(&instant_config());
    let mut seen = Vec::new();

    wait_until(&handle, &mut seen, |s| s.can_start());
    handle.start().unwrap();

    let snapshot = wait_until(&handle, &mut seen, |s| s.transport == TransportState::Ready);
    assert!(snapshot.app.is_connected());
    assert!(snapshot.error.is_none());

    // Mic comes on once the agent is ready
    let snapshot = wait_until(&handle, &mut seen, |s| s.mic_enabled);
    assert!(snapshot.mic_enabled);
    assert!(transport.is_mic_enabled());

    handle.enable_mic(false).unwrap();
    wait_until(&handle, &mut seen, |s| !s.mic_enabled);
    assert!(!transport.is_mic_enabled());

    handle.leave().unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !seen.contains(&SessionEvent::ReloadRequested) {
        assert!(Instant::now() < deadline, "no reload requested");
        if let Some(event) = handle.recv_event_timeout(Duration::from_millis(50)) {
            seen.push(event);
        }
    }
    assert_eq!(handle.state().transport_state(), TransportState::Disconnected);
    assert!(handle.state().is_reload_requested());
    assert!(seen.contains(&SessionEvent::Started));
    assert_eq!(transport.init_calls(), 1);

    handle.shutdown();
}

#[test]
fn test_worker_respects_start_audio_off() {
    let (mut handle, transport) = start_worker(&instant_config());
    let mut seen = Vec::new();

    wait_until(&handle, &mut seen, |s| s.can_start());
    handle.set_start_audio_off(true).unwrap();
    handle.start().unwrap();

    let snapshot = wait_until(&handle, &mut seen, |s| s.transport == TransportState::Ready);
    assert!(snapshot.start_audio_off);
    assert!(handle.state().start_audio_off());

    // Give the follower a moment to handle the ready state
    std::thread::sleep(Duration::from_millis(100));
    assert!(!handle.snapshot().mic_enabled);
    assert!(!transport.is_mic_enabled());

    handle.shutdown();
}

#[test]
fn test_worker_surfaces_rate_limit() {
    let config = instant_config().with_simulation(SimulationConfig::instant().rate_limited());
    let (mut handle, _transport) = start_worker(&config);
    let mut seen = Vec::new();

    wait_until(&handle, &mut seen, |s| s.can_start());
    handle.start().unwrap();

    let snapshot = wait_until(&handle, &mut seen, |s| s.error.is_some());
    assert_eq!(snapshot.error.as_deref(), Some(AT_CAPACITY));
    assert!(!snapshot.can_start());

    handle.shutdown();
}

#[test]
fn test_shutdown_emits_event() {
    let (mut handle, _transport) = start_worker(&instant_config());
    handle.shutdown();

    let mut last = None;
    while let Some(event) = handle.try_recv_event() {
        last = Some(event);
    }
    assert_eq!(last, Some(SessionEvent::Shutdown));
}
