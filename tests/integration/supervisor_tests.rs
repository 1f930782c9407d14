//! Supervisor integration tests: fake display and receiver, paused clock

mod common;

use avsync::core::config::Timeouts;
use avsync::core::events::DisplayEvent;
use avsync::core::state::{SharedState, TvStatus};
use avsync::display::DisplayError;
use avsync::receiver::{CommandSerializer, ReceiverCommand};
use avsync::supervisor::Supervisor;
use avsync_protocol::{KnownApp, PowerState, StatusResponse};
use common::{wait_until, Connection, FakeConnector, FakeTransport};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Harness {
    transport: Arc<FakeTransport>,
    connector: Arc<FakeConnector>,
    connections: mpsc::UnboundedReceiver<Connection>,
    shared: Arc<SharedState>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let transport = Arc::new(FakeTransport::default());
        let serializer = Arc::new(CommandSerializer::new(transport.clone()));
        let (connector, connections) = FakeConnector::new();
        let shared = Arc::new(SharedState::new());
        let supervisor = Supervisor::new(
            connector.clone(),
            serializer,
            Arc::clone(&shared),
            Timeouts::default(),
        );

        let shutdown = CancellationToken::new();
        let task = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { supervisor.run(shutdown).await }
        });

        Self {
            transport,
            connector,
            connections,
            shared,
            shutdown,
            task,
        }
    }

    async fn next_connection(&mut self) -> Connection {
        self.connections.recv().await.expect("connector dropped")
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap();
    }
}

fn app_changed(app: KnownApp) -> DisplayEvent {
    DisplayEvent::AppChanged(Some(app.app_id().to_string()))
}

#[tokio::test(start_paused = true)]
async fn test_display_on_to_pc() {
    let mut h = Harness::start();
    let conn = h.next_connection().await;
    assert_eq!(
        h.shared.status().to_response(),
        StatusResponse {
            state: PowerState::Unknown,
            input: None
        }
    );

    conn.events.send(app_changed(KnownApp::Pc)).unwrap();
    let transport = h.transport.clone();
    wait_until(|| transport.sent.lock().len() == 2).await;

    let sent = transport.sent.lock().clone();
    assert_eq!(
        transport.codes(),
        vec![ReceiverCommand::PowerOn.code(), ReceiverCommand::InputGame.code()]
    );
    assert!(sent[1].0 - sent[0].0 >= Duration::from_secs(1));
    assert_eq!(
        h.shared.status().to_response(),
        StatusResponse {
            state: PowerState::On,
            input: Some("PC".to_string())
        }
    );
    assert!(h.shared.display().is_some());

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_queued_notifications_keep_order() {
    let mut h = Harness::start();
    let conn = h.next_connection().await;

    // The second notification arrives while the receiver is settling
    conn.events.send(app_changed(KnownApp::Pc)).unwrap();
    conn.events.send(app_changed(KnownApp::Pc)).unwrap();
    conn.events.send(app_changed(KnownApp::Receiver)).unwrap();

    let transport = h.transport.clone();
    wait_until(|| transport.sent.lock().len() == 3).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(
        transport.codes(),
        vec![
            ReceiverCommand::PowerOn.code(),
            ReceiverCommand::InputGame.code(),
            ReceiverCommand::InputBdDvd.code(),
        ]
    );
    assert_eq!(h.shared.status().to_response().input.as_deref(), Some("Receiver"));

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_power_off_then_reconnect() {
    let mut h = Harness::start();
    let conn = h.next_connection().await;

    conn.events.send(app_changed(KnownApp::Pc)).unwrap();
    conn.events.send(DisplayEvent::AppChanged(None)).unwrap();

    let transport = h.transport.clone();
    wait_until(|| transport.sent.lock().len() == 3).await;
    assert_eq!(
        transport.codes()[2],
        ReceiverCommand::PowerOff.code(),
        "no input change after power off"
    );
    assert_eq!(h.shared.status().power, PowerState::Off);
    let off_at = transport.sent.lock()[2].0;

    // Idle session ends normally: settle, then the long reconnect delay
    let second = h.next_connection().await;
    assert!(second.at - off_at >= Duration::from_secs(6));
    assert!(conn.display.disconnected.load(Ordering::SeqCst));
    assert_eq!(h.shared.status(), TvStatus::default());
    assert_eq!(transport.sent.lock().len(), 3);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_idle_display_polls_on_reconnect_delay() {
    let mut h = Harness::start();
    let first = h.next_connection().await;

    // Display reports nothing focused: no commands, session ends
    first.events.send(DisplayEvent::AppChanged(None)).unwrap();
    let second = h.next_connection().await;

    let waited = second.at - first.at;
    assert!(waited >= Duration::from_secs(5));
    assert!(waited < Duration::from_secs(6));
    assert!(h.transport.sent.lock().is_empty());

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_error_mid_session_resets_and_retries() {
    let mut h = Harness::start();
    let conn = h.next_connection().await;

    conn.events.send(app_changed(KnownApp::Receiver)).unwrap();
    let transport = h.transport.clone();
    wait_until(|| transport.sent.lock().len() == 2).await;
    assert_eq!(h.shared.status().power, PowerState::On);

    let failed_at = Instant::now();
    conn.events
        .send(DisplayEvent::Failed(DisplayError::Closed))
        .unwrap();

    let shared = Arc::clone(&h.shared);
    wait_until(|| shared.status() == TvStatus::default()).await;
    assert_eq!(
        shared.status().to_response(),
        StatusResponse {
            state: PowerState::Unknown,
            input: None
        }
    );
    assert!(shared.display().is_none());
    assert!(conn.display.disconnected.load(Ordering::SeqCst));

    let second = h.next_connection().await;
    let waited = second.at - failed_at;
    assert!(waited >= Duration::from_secs(3));
    assert!(waited < Duration::from_secs(5));

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_display_failure_waits_for_current_transition() {
    let mut h = Harness::start();
    let conn = h.next_connection().await;

    // The failure is queued while the receiver settles after power on
    let sent_at = Instant::now();
    conn.events.send(app_changed(KnownApp::Pc)).unwrap();
    conn.events
        .send(DisplayEvent::Failed(DisplayError::Closed))
        .unwrap();

    let second = h.next_connection().await;
    assert_eq!(
        h.transport.codes(),
        vec![ReceiverCommand::PowerOn.code(), ReceiverCommand::InputGame.code()]
    );
    // Settle, then the failure retry delay
    assert!(second.at - sent_at >= Duration::from_secs(4));
    assert!(second.at - sent_at < Duration::from_secs(5));

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_clean_disconnect_powers_receiver_off() {
    let mut h = Harness::start();
    let conn = h.next_connection().await;

    conn.events.send(app_changed(KnownApp::Pc)).unwrap();
    let transport = h.transport.clone();
    wait_until(|| transport.sent.lock().len() == 2).await;

    let closed_at = Instant::now();
    conn.events.send(DisplayEvent::Disconnected).unwrap();
    wait_until(|| transport.sent.lock().len() == 3).await;
    assert_eq!(transport.codes()[2], ReceiverCommand::PowerOff.code());

    let second = h.next_connection().await;
    assert!(second.at - closed_at >= Duration::from_secs(5));

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_receiver_failure_restarts_session() {
    let mut h = Harness::start();
    h.transport.fail.store(true, Ordering::SeqCst);
    let conn = h.next_connection().await;

    conn.events.send(app_changed(KnownApp::Pc)).unwrap();
    let second = h.next_connection().await;

    // The failed power-on abandoned the rest of the transition
    assert_eq!(h.transport.codes(), vec![ReceiverCommand::PowerOn.code()]);
    assert!(second.at - conn.at >= Duration::from_secs(3));
    assert!(second.at - conn.at < Duration::from_secs(5));
    assert_eq!(h.connector.attempts.load(Ordering::SeqCst), 2);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_failures_retry() {
    let started = Instant::now();
    let mut h = Harness::start();
    h.connector.fail_next.store(2, Ordering::SeqCst);

    let conn = h.next_connection().await;
    assert_eq!(h.connector.attempts.load(Ordering::SeqCst), 3);
    assert!(conn.at - started >= Duration::from_secs(6));

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_reconnecting() {
    let mut h = Harness::start();
    let _conn = h.next_connection().await;

    let connector = h.connector.clone();
    let shared = Arc::clone(&h.shared);
    h.stop().await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    assert!(shared.display().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_retry_delay() {
    let h = Harness::start();
    h.connector.fail_next.store(1, Ordering::SeqCst);

    let connector = h.connector.clone();
    wait_until(|| connector.attempts.load(Ordering::SeqCst) == 1).await;
    h.stop().await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
}
