//! Session stop signal
//!
//! Each display session owns one `StopSignal`. It resolves exactly once:
//! with a `SessionEnd` when the display went idle or disconnected, or with a
//! `SessionError` when the connection or the receiver failed. Later attempts
//! to resolve it are ignored and report `false`.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::display::DisplayError;
use crate::receiver::ReceiverError;

/// Normal end of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The display reported no foreground app
    Idle,
    /// The display closed the connection
    Disconnected,
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEnd::Idle => write!(f, "display idle"),
            SessionEnd::Disconnected => write!(f, "display disconnected"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("display: {0}")]
    Display(#[from] DisplayError),
    #[error("receiver: {0}")]
    Receiver(#[from] ReceiverError),
    #[error("display event stream closed")]
    EventsClosed,
    #[error("stop signal dropped")]
    Abandoned,
}

pub type SessionOutcome = Result<SessionEnd, SessionError>;

/// Settable-once stop signal, cloneable across the session's collaborators
#[derive(Clone)]
pub struct StopSignal {
    slot: Arc<Mutex<Option<oneshot::Sender<SessionOutcome>>>>,
}

/// Resolves with the session outcome
pub struct StopWaiter {
    rx: oneshot::Receiver<SessionOutcome>,
}

impl StopSignal {
    pub fn new() -> (Self, StopWaiter) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            StopWaiter { rx },
        )
    }

    /// Resolve with a normal end. Returns `false` if already resolved.
    pub fn complete(&self, end: SessionEnd) -> bool {
        self.resolve(Ok(end))
    }

    /// Resolve with an error. Returns `false` if already resolved.
    pub fn fail(&self, error: impl Into<SessionError>) -> bool {
        self.resolve(Err(error.into()))
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn resolve(&self, outcome: SessionOutcome) -> bool {
        match self.slot.lock().take() {
            Some(tx) => {
                // Waiter gone means the session is already over
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

impl Future for StopWaiter {
    type Output = SessionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(SessionError::Abandoned)))
    }
}
