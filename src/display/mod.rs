//! Display module - the smart display whose foreground app drives the receiver

pub mod webos;

pub use webos::WebOsConnector;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::core::events::EventSender;

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid message from display: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("display rejected the request: {0}")]
    Rejected(String),
    #[error("connection closed")]
    Closed,
}

/// A live connection to the display
#[async_trait]
pub trait DisplayClient: Send + Sync {
    /// Last foreground app id reported by the display
    fn current_app(&self) -> Option<String>;

    /// Bring the given app to the foreground
    async fn launch_app(&self, app_id: &str) -> Result<(), DisplayError>;

    async fn power_off(&self) -> Result<(), DisplayError>;

    /// Tear the connection down. No further events are sent afterwards.
    async fn disconnect(&self);
}

/// Opens display connections
#[async_trait]
pub trait DisplayConnector: Send + Sync {
    /// Connect and subscribe to foreground-app changes, which are pushed to
    /// `events` together with disconnects and failures.
    async fn connect(&self, events: EventSender) -> Result<Arc<dyn DisplayClient>, DisplayError>;
}
