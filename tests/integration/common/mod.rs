//! Fakes for the display, receiver and wake-signal collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use avsync::core::events::EventSender;
use avsync::display::{DisplayClient, DisplayConnector, DisplayError};
use avsync::receiver::{ReceiverError, ReceiverTransport};
use avsync::wol::{MacAddr, WakeError, WakeSignal};
use parking_lot::Mutex;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Records every code it is asked to send, with the time of the call
#[derive(Default)]
pub struct FakeTransport {
    pub sent: Mutex<Vec<(Instant, u32)>>,
    pub fail: AtomicBool,
}

impl FakeTransport {
    pub fn codes(&self) -> Vec<u32> {
        self.sent.lock().iter().map(|(_, code)| *code).collect()
    }
}

#[async_trait]
impl ReceiverTransport for FakeTransport {
    async fn send_code(&self, code: u32) -> Result<(), ReceiverError> {
        self.sent.lock().push((Instant::now(), code));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReceiverError::Status { code, status: 503 });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDisplay {
    pub launched: Mutex<Vec<String>>,
    pub power_offs: AtomicUsize,
    pub disconnected: AtomicBool,
}

#[async_trait]
impl DisplayClient for FakeDisplay {
    fn current_app(&self) -> Option<String> {
        self.launched.lock().last().cloned()
    }

    async fn launch_app(&self, app_id: &str) -> Result<(), DisplayError> {
        self.launched.lock().push(app_id.to_string());
        Ok(())
    }

    async fn power_off(&self) -> Result<(), DisplayError> {
        self.power_offs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// A successful connection as seen by the test
pub struct Connection {
    pub events: EventSender,
    pub display: Arc<FakeDisplay>,
    pub at: Instant,
}

/// Hands every successful connection to the test through a channel
pub struct FakeConnector {
    pub attempts: AtomicUsize,
    /// Number of upcoming connect calls that fail
    pub fail_next: AtomicUsize,
    connections: mpsc::UnboundedSender<Connection>,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Connection>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                attempts: AtomicUsize::new(0),
                fail_next: AtomicUsize::new(0),
                connections: tx,
            }),
            rx,
        )
    }
}

#[async_trait]
impl DisplayConnector for FakeConnector {
    async fn connect(&self, events: EventSender) -> Result<Arc<dyn DisplayClient>, DisplayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DisplayError::Timeout(Duration::from_secs(3)));
        }

        let display = Arc::new(FakeDisplay::default());
        let _ = self.connections.send(Connection {
            events,
            display: Arc::clone(&display),
            at: Instant::now(),
        });
        Ok(display)
    }
}

#[derive(Default)]
pub struct FakeWaker {
    pub woken: Mutex<Vec<(MacAddr, Option<IpAddr>)>>,
}

#[async_trait]
impl WakeSignal for FakeWaker {
    async fn wake(&self, mac: MacAddr, via: Option<IpAddr>) -> Result<(), WakeError> {
        self.woken.lock().push((mac, via));
        Ok(())
    }
}

/// Poll `cond` while letting (paused) time advance
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
