//! Shared daemon state
//!
//! The display's active app, the power state derived from it, and the handle
//! of the current display connection. The supervisor task is the only
//! writer; the control surface reads snapshots.

use avsync_protocol::{KnownApp, PowerState, StatusResponse};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::display::DisplayClient;

/// Application focused on the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum App {
    /// An input with a dedicated receiver input
    Known(KnownApp),
    /// Anything else (built-in tuner, streaming apps, settings, ...)
    Other(String),
}

impl App {
    /// Classify a raw app id reported by the display.
    pub fn from_app_id(app_id: impl Into<String>) -> Self {
        let app_id = app_id.into();
        match KnownApp::from_app_id(&app_id) {
            Some(known) => App::Known(known),
            None => App::Other(app_id),
        }
    }

    /// Known input name, or the raw app id
    pub fn display_name(&self) -> &str {
        match self {
            App::Known(known) => known.name(),
            App::Other(app_id) => app_id,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, App::Known(_))
    }
}

impl std::fmt::Display for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What the daemon currently believes about the display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TvStatus {
    pub power: PowerState,
    /// `None` while the display is off or idle
    pub app: Option<App>,
}

impl TvStatus {
    pub fn to_response(&self) -> StatusResponse {
        StatusResponse {
            state: self.power,
            input: self.app.as_ref().map(|app| app.display_name().to_string()),
        }
    }
}

/// Process-wide state shared by the supervisor and the control surface
#[derive(Default)]
pub struct SharedState {
    status: RwLock<TvStatus>,
    display: RwLock<Option<Arc<dyn DisplayClient>>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current status
    pub fn status(&self) -> TvStatus {
        self.status.read().clone()
    }

    pub fn power(&self) -> PowerState {
        self.status.read().power
    }

    pub fn publish(&self, status: TvStatus) {
        *self.status.write() = status;
    }

    /// Handle of the live display connection, if any
    pub fn display(&self) -> Option<Arc<dyn DisplayClient>> {
        self.display.read().clone()
    }

    pub fn set_display(&self, client: Option<Arc<dyn DisplayClient>>) {
        *self.display.write() = client;
    }
}
