//! Display connection events

use tokio::sync::mpsc;

use crate::display::DisplayError;

/// Events pushed by a display connection to its session
#[derive(Debug)]
pub enum DisplayEvent {
    /// The foreground app changed; `None` when nothing is focused (display off/idle)
    AppChanged(Option<String>),
    /// The connection closed cleanly
    Disconnected,
    /// The connection broke
    Failed(DisplayError),
}

/// Sender half handed to a display connection. Events are processed in
/// the order they are sent.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<DisplayEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<DisplayEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: DisplayEvent) -> Result<(), mpsc::error::SendError<DisplayEvent>> {
        self.tx.send(event)
    }
}
