//! Shared types for the avsync HTTP control surface.
//!
//! This crate is intentionally lightweight (only `serde` + `serde_json`).
//! It defines:
//! - The aggregate power state reported for the display/receiver pair
//! - The closed set of named display inputs (`KnownApp`)
//! - HTTP REST response types

use serde::{Deserialize, Serialize};

// ── Device types (shared) ──────────────────────────────────────────

/// Believed aggregate power state of the display and receiver.
///
/// `Unknown` after every (re)connect until the display reports an app
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    #[default]
    Unknown,
    On,
    Off,
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerState::Unknown => write!(f, "unknown"),
            PowerState::On => write!(f, "on"),
            PowerState::Off => write!(f, "off"),
        }
    }
}

/// Display applications with a dedicated receiver input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownApp {
    /// HDMI input wired to the PC
    #[serde(rename = "PC")]
    Pc,
    /// HDMI input wired to the secondary receiver box
    Receiver,
}

impl KnownApp {
    pub const ALL: [KnownApp; 2] = [KnownApp::Pc, KnownApp::Receiver];

    /// Name used on the control surface (`?input=PC`)
    pub fn name(self) -> &'static str {
        match self {
            KnownApp::Pc => "PC",
            KnownApp::Receiver => "Receiver",
        }
    }

    /// Application id the display reports when this input is focused
    pub fn app_id(self) -> &'static str {
        match self {
            KnownApp::Pc => "com.webos.app.hdmi4",
            KnownApp::Receiver => "com.webos.app.hdmi3",
        }
    }

    /// Exact, case-sensitive lookup by control-surface name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|app| app.name() == name)
    }

    pub fn from_app_id(app_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|app| app.app_id() == app_id)
    }
}

impl std::fmt::Display for KnownApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── HTTP REST types ────────────────────────────────────────────────

/// Default control surface listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:12345";

/// GET /tv response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: PowerState,
    /// Known input name, or the raw app id for anything else; `null` when idle
    pub input: Option<String>,
}

/// Query string accepted by POST /tv/on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TvOnQuery {
    #[serde(default)]
    pub input: Option<String>,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
