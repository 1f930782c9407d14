//! HTTP REST control surface
//!
//! Read-only status plus a few triggers. Device-side failures are logged and
//! never surface to the caller: every request that names a valid input gets
//! `200 OK`.

use avsync_protocol::{ApiError, KnownApp, PowerState, StatusResponse, TvOnQuery};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::core::state::SharedState;
use crate::wol::{MacAddr, WakeSignal};

/// State behind the control surface
pub struct ControlState {
    /// Read-only view of the supervisor's state
    pub shared: Arc<SharedState>,
    pub waker: Arc<dyn WakeSignal>,
    pub display_mac: MacAddr,
    /// Wake packets for the display are sent straight to this address
    pub display_address: IpAddr,
    pub pc_mac: MacAddr,
    /// Wait between waking the display and launching an input
    pub display_boot: Duration,
}

pub fn router(state: Arc<ControlState>) -> Router {
    Router::new()
        .route("/tv", get(get_tv))
        .route("/tv/on", post(post_tv_on))
        .route("/tv/off", post(post_tv_off))
        .route("/pc/on", post(post_pc_on))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn ok() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// GET /tv
pub async fn get_tv(State(state): State<Arc<ControlState>>) -> Json<StatusResponse> {
    Json(state.shared.status().to_response())
}

/// POST /tv/on[?input=NAME]
pub async fn post_tv_on(
    State(state): State<Arc<ControlState>>,
    Query(query): Query<TvOnQuery>,
) -> Response {
    // Validate before any side effect
    let input = match query.input.as_deref().filter(|name| !name.is_empty()) {
        None => None,
        Some(name) => match KnownApp::from_name(name) {
            Some(app) => Some(app),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError {
                        error: format!("unknown input: {}", name),
                    }),
                )
                    .into_response();
            }
        },
    };

    let mut boot_owed = false;
    if state.shared.power() != PowerState::On {
        info!("Turning display on");
        if let Err(e) = state
            .waker
            .wake(state.display_mac, Some(state.display_address))
            .await
        {
            warn!("Failed to wake display: {}", e);
        }
        boot_owed = true;
    }

    if let Some(app) = input {
        if boot_owed {
            info!("Waiting {:?} for the display to boot", state.display_boot);
            tokio::time::sleep(state.display_boot).await;
        }
        match state.shared.display() {
            Some(display) => {
                if let Err(e) = display.launch_app(app.app_id()).await {
                    warn!("Failed to launch {}: {}", app, e);
                }
            }
            None => warn!("No display connection, cannot switch to {}", app),
        }
    }

    ok()
}

/// POST /tv/off
pub async fn post_tv_off(State(state): State<Arc<ControlState>>) -> Response {
    if state.shared.power() == PowerState::On {
        match state.shared.display() {
            Some(display) => {
                if let Err(e) = display.power_off().await {
                    warn!("Failed to turn display off: {}", e);
                }
            }
            None => warn!("No display connection, cannot turn it off"),
        }
    }
    ok()
}

/// POST /pc/on
pub async fn post_pc_on(State(state): State<Arc<ControlState>>) -> Response {
    info!("Turning PC on");
    if let Err(e) = state.waker.wake(state.pc_mac, None).await {
        warn!("Failed to wake PC: {}", e);
    }
    ok()
}
