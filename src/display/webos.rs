//! LG webOS client (SSAP over WebSocket)
//!
//! Only what the daemon needs: registration (pairing), a subscription to the
//! foreground app, app launch and power off. Requests are fire-and-forget;
//! errors the display reports for them are logged.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{DisplayClient, DisplayConnector, DisplayError};
use crate::core::events::{DisplayEvent, EventSender};

const SSAP_PORT: u16 = 3000;

/// How long to wait for the user to accept the pairing prompt
const PAIRING_TIMEOUT: Duration = Duration::from_secs(60);

const FOREGROUND_APP_URI: &str = "ssap://com.webos.applicationManager/getForegroundAppInfo";
const LAUNCH_URI: &str = "ssap://system.launcher/launch";
const TURN_OFF_URI: &str = "ssap://system/turnOff";

const REGISTER_ID: &str = "register_0";
const FOREGROUND_ID: &str = "foreground_app";

const PERMISSIONS: &[&str] = &[
    "LAUNCH",
    "CONTROL_POWER",
    "READ_RUNNING_APPS",
    "READ_INSTALLED_APPS",
    "READ_POWER_STATE",
    "READ_INPUT_DEVICE_LIST",
];

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Outgoing SSAP frame
#[derive(Debug, Serialize)]
struct Request<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

/// Incoming SSAP frame
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    error: Option<String>,
}

/// What an incoming frame means to the client
#[derive(Debug, PartialEq)]
enum Incoming {
    Registered { client_key: Option<String> },
    PairingPrompt,
    /// Foreground app update; an empty app id means nothing is focused
    ForegroundApp(Option<String>),
    Error { id: Option<String>, message: String },
    Other,
}

fn parse_frame(text: &str) -> Result<Incoming, serde_json::Error> {
    let frame: Frame = serde_json::from_str(text)?;
    let incoming = match frame.kind.as_str() {
        "registered" => Incoming::Registered {
            client_key: frame
                .payload
                .get("client-key")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        "error" => Incoming::Error {
            id: frame.id,
            message: frame.error.unwrap_or_else(|| "unknown error".to_string()),
        },
        "response" => match frame.id.as_deref() {
            Some(REGISTER_ID)
                if frame.payload.get("pairingType").and_then(Value::as_str) == Some("PROMPT") =>
            {
                Incoming::PairingPrompt
            }
            Some(FOREGROUND_ID) => match frame.payload.get("appId").and_then(Value::as_str) {
                Some(app_id) => {
                    Incoming::ForegroundApp(Some(app_id).filter(|id| !id.is_empty()).map(str::to_string))
                }
                None => Incoming::Other,
            },
            _ => Incoming::Other,
        },
        _ => Incoming::Other,
    };
    Ok(incoming)
}

fn encode_request(
    kind: &str,
    id: String,
    uri: Option<&str>,
    payload: Option<Value>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Request {
        kind,
        id,
        uri,
        payload,
    })
}

fn register_request(client_key: Option<&str>) -> Result<String, serde_json::Error> {
    let mut payload = json!({
        "forcePairing": false,
        "pairingType": "PROMPT",
        "manifest": {
            "manifestVersion": 1,
            "appVersion": "1.0",
            "permissions": PERMISSIONS,
        },
    });
    if let Some(key) = client_key {
        payload["client-key"] = json!(key);
    }
    encode_request("register", REGISTER_ID.to_string(), None, Some(payload))
}

/// Connects to a webOS display on the local network
pub struct WebOsConnector {
    address: IpAddr,
    client_key: Option<String>,
    timeout: Duration,
}

impl WebOsConnector {
    pub fn new(address: IpAddr, client_key: Option<String>, timeout: Duration) -> Self {
        Self {
            address,
            client_key,
            timeout,
        }
    }

    fn url(&self) -> String {
        format!("ws://{}/", SocketAddr::new(self.address, SSAP_PORT))
    }
}

#[async_trait]
impl DisplayConnector for WebOsConnector {
    async fn connect(&self, events: EventSender) -> Result<Arc<dyn DisplayClient>, DisplayError> {
        let url = self.url();
        debug!("Connecting to {}", url);

        let (stream, _) = tokio::time::timeout(self.timeout, tokio_tungstenite::connect_async(url.as_str()))
            .await
            .map_err(|_| DisplayError::Timeout(self.timeout))??;
        let (mut sink, mut source) = stream.split();

        sink.send(Message::text(register_request(self.client_key.as_deref())?))
            .await?;
        if let Some(key) = await_registration(&mut source).await? {
            if self.client_key.as_deref() != Some(key.as_str()) {
                info!(
                    "Paired with display; set display.client_key = \"{}\" to skip the prompt next time",
                    key
                );
            }
        }

        let subscribe = encode_request(
            "subscribe",
            FOREGROUND_ID.to_string(),
            Some(FOREGROUND_APP_URI),
            None,
        )?;
        sink.send(Message::text(subscribe)).await?;

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let current_app = Arc::new(Mutex::new(None));
        let writer = tokio::spawn(run_writer(sink, out_rx));
        let reader = tokio::spawn(run_reader(source, Arc::clone(&current_app), events));

        info!("Connected to display at {}", self.address);
        Ok(Arc::new(WebOsClient {
            out_tx,
            current_app,
            next_id: AtomicU32::new(1),
            tasks: Mutex::new(vec![writer, reader]),
        }))
    }
}

/// Wait for the `registered` frame, logging the pairing prompt if one shows up
async fn await_registration(source: &mut WsSource) -> Result<Option<String>, DisplayError> {
    loop {
        let next = tokio::time::timeout(PAIRING_TIMEOUT, source.next())
            .await
            .map_err(|_| DisplayError::Timeout(PAIRING_TIMEOUT))?;
        match next {
            Some(Ok(Message::Text(text))) => match parse_frame(&text)? {
                Incoming::Registered { client_key } => return Ok(client_key),
                Incoming::PairingPrompt => info!("Accept the pairing request on the display"),
                Incoming::Error { message, .. } => return Err(DisplayError::Rejected(message)),
                _ => {}
            },
            Some(Ok(Message::Close(_))) | None => return Err(DisplayError::Closed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn run_writer(mut sink: WsSink, mut out_rx: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = out_rx.recv().await {
        if let Err(e) = sink.send(Message::text(text)).await {
            warn!("Display write failed: {}", e);
            break;
        }
    }
    let _ = sink.close().await;
}

async fn run_reader(
    mut source: WsSource,
    current_app: Arc<Mutex<Option<String>>>,
    events: EventSender,
) {
    let end = loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(Incoming::ForegroundApp(app)) => {
                    debug!("Foreground app: {:?}", app);
                    *current_app.lock() = app.clone();
                    let _ = events.send(DisplayEvent::AppChanged(app));
                }
                Ok(Incoming::Error { id, message }) => {
                    warn!("Display request {:?} failed: {}", id, message);
                }
                Ok(_) => {}
                Err(e) => debug!("Ignoring malformed frame: {}", e),
            },
            Some(Ok(Message::Close(_))) | None => break DisplayEvent::Disconnected,
            Some(Ok(_)) => {}
            Some(Err(e)) => break DisplayEvent::Failed(e.into()),
        }
    };

    *current_app.lock() = None;
    let _ = events.send(end);
}

/// Live webOS connection
pub struct WebOsClient {
    out_tx: mpsc::UnboundedSender<String>,
    current_app: Arc<Mutex<Option<String>>>,
    next_id: AtomicU32,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WebOsClient {
    fn request(&self, uri: &str, payload: Option<Value>) -> Result<(), DisplayError> {
        let id = format!("request_{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let text = encode_request("request", id, Some(uri), payload)?;
        self.out_tx.send(text).map_err(|_| DisplayError::Closed)
    }
}

#[async_trait]
impl DisplayClient for WebOsClient {
    fn current_app(&self) -> Option<String> {
        self.current_app.lock().clone()
    }

    async fn launch_app(&self, app_id: &str) -> Result<(), DisplayError> {
        info!("Launching {} on the display", app_id);
        self.request(LAUNCH_URI, Some(json!({ "id": app_id })))
    }

    async fn power_off(&self) -> Result<(), DisplayError> {
        info!("Turning display off");
        self.request(TURN_OFF_URI, None)
    }

    async fn disconnect(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for WebOsClient {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
