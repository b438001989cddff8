//! WebSocket client for the live bidirectional generate-content service.
//!
//! [`LiveClient`] implements [`LiveSession`]: model and configuration are
//! collected before [`LiveClient::connect`], sent as the `setup` message, and
//! a background task then routes `toolCall` messages to subscribers while
//! tool responses are forwarded to the server.

use std::sync::{Arc, Mutex};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

use super::session::{LiveSession, ToolCallSubscribers};
use super::types::{
    Content, LiveConnectConfig, LiveServerToolCall, LiveToolResponse, Modality, SpeechConfig,
    Tool,
};
use crate::error::{AltairError, Result};

/// Connection status of a [`LiveClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected.
    Disconnected,
    /// Socket opening or setup sent but not yet acknowledged.
    Connecting,
    /// Setup acknowledged; tool calls may arrive.
    Connected,
    /// Unrecoverable connection error.
    Failed(String),
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed(msg) => write!(f, "Failed: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup {
    model: String,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
enum ClientMessage {
    Setup(Setup),
    ToolResponse(LiveToolResponse),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerMessage {
    #[serde(default)]
    setup_complete: Option<Value>,
    #[serde(default)]
    tool_call: Option<LiveServerToolCall>,
    #[serde(default)]
    tool_call_cancellation: Option<ToolCallCancellation>,
    #[serde(default)]
    server_content: Option<ServerContent>,
    #[serde(default)]
    go_away: Option<GoAway>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolCallCancellation {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    #[serde(default)]
    model_turn: Option<ModelTurn>,
    #[serde(default)]
    turn_complete: bool,
    #[serde(default)]
    interrupted: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoAway {
    #[serde(default)]
    time_left: Option<String>,
}

/// A decoded server message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The server accepted the setup message.
    SetupComplete,
    /// The model is invoking host tools.
    ToolCall(LiveServerToolCall),
    /// Previously issued calls should be abandoned.
    ToolCallCancellation { ids: Vec<String> },
    /// Model output. Only text parts are kept; audio is not played here.
    Content {
        text: Vec<String>,
        turn_complete: bool,
        interrupted: bool,
    },
    /// The server will close the connection soon.
    GoAway { time_left: Option<String> },
    /// A message with no field this client handles.
    Unknown,
}

/// Decode one server frame.
///
/// # Errors
///
/// Returns [`AltairError::Json`] if the frame is not valid JSON.
pub fn parse_server_message(text: &str) -> Result<ServerEvent> {
    let raw: RawServerMessage = serde_json::from_str(text)?;

    if let Some(tool_call) = raw.tool_call {
        return Ok(ServerEvent::ToolCall(tool_call));
    }
    if let Some(cancellation) = raw.tool_call_cancellation {
        return Ok(ServerEvent::ToolCallCancellation {
            ids: cancellation.ids,
        });
    }
    if let Some(content) = raw.server_content {
        let text = content
            .model_turn
            .map(|turn| {
                turn.parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        return Ok(ServerEvent::Content {
            text,
            turn_complete: content.turn_complete,
            interrupted: content.interrupted,
        });
    }
    if raw.setup_complete.is_some() {
        return Ok(ServerEvent::SetupComplete);
    }
    if let Some(go_away) = raw.go_away {
        return Ok(ServerEvent::GoAway {
            time_left: go_away.time_left,
        });
    }
    Ok(ServerEvent::Unknown)
}

// ---------------------------------------------------------------------------
// LiveClient
// ---------------------------------------------------------------------------

/// A live session backed by a WebSocket connection.
pub struct LiveClient {
    endpoint: String,
    api_key: String,
    model: Mutex<String>,
    config: Mutex<LiveConnectConfig>,
    tool_calls: Arc<ToolCallSubscribers>,
    status: Arc<Mutex<ConnectionStatus>>,
    /// Outbound JSON frames for the background task. `None` when disconnected.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(p) => p.into_inner(),
    }
}

impl LiveClient {
    /// Create a disconnected client for `endpoint`, authenticating with `api_key`.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: Mutex::new(String::new()),
            config: Mutex::new(LiveConnectConfig::default()),
            tool_calls: Arc::new(ToolCallSubscribers::new()),
            status: Arc::new(Mutex::new(ConnectionStatus::Disconnected)),
            outbound: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        lock(&self.status).clone()
    }

    fn set_status(&self, status: ConnectionStatus) {
        *lock(&self.status) = status;
    }

    /// The endpoint URL including the API key query parameter.
    ///
    /// # Errors
    ///
    /// Returns a config error if the endpoint is not a valid URL.
    pub fn connect_url(&self) -> Result<url::Url> {
        let raw = format!(
            "{}?key={}",
            self.endpoint,
            urlencoding::encode(&self.api_key)
        );
        url::Url::parse(&raw).map_err(|e| {
            AltairError::Config(format!("invalid live endpoint '{}': {e}", self.endpoint))
        })
    }

    fn setup_message(&self) -> ClientMessage {
        let config = lock(&self.config).clone();
        ClientMessage::Setup(Setup {
            model: lock(&self.model).clone(),
            generation_config: GenerationConfig {
                response_modalities: config.response_modalities,
                speech_config: config.speech_config,
            },
            system_instruction: config.system_instruction,
            tools: config.tools,
        })
    }

    /// Open the WebSocket, send the setup message and start routing events.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the socket cannot be opened or the setup
    /// message cannot be sent.
    pub async fn connect(&self) -> Result<()> {
        let url = self.connect_url()?;
        if lock(&self.model).is_empty() {
            return Err(AltairError::Config("no model selected".into()));
        }

        self.set_status(ConnectionStatus::Connecting);
        tracing::info!(endpoint = %self.endpoint, "connecting to live session");

        let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                self.set_status(ConnectionStatus::Failed(e.to_string()));
                return Err(AltairError::Transport(format!("connect: {e}")));
            }
        };
        let (mut write, read) = ws_stream.split();

        let setup = serde_json::to_string(&self.setup_message())?;
        if let Err(e) = write.send(Message::Text(setup)).await {
            self.set_status(ConnectionStatus::Failed(e.to_string()));
            return Err(AltairError::Transport(format!("send setup: {e}")));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.outbound) = Some(tx);

        let tool_calls = Arc::clone(&self.tool_calls);
        let status = Arc::clone(&self.status);
        let handle = tokio::spawn(async move {
            let result = connection_loop(write, read, rx, &tool_calls, &status).await;
            let mut s = lock(&status);
            *s = match result {
                Ok(()) => ConnectionStatus::Disconnected,
                Err(e) => {
                    tracing::warn!("live session connection ended: {e}");
                    ConnectionStatus::Failed(e)
                }
            };
        });
        *lock(&self.task) = Some(handle);
        Ok(())
    }

    /// Close the connection. The background task sends a close frame and exits.
    pub async fn disconnect(&self) {
        lock(&self.outbound).take();
        let handle = lock(&self.task).take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!("live session task failed: {e}");
        }
    }
}

#[async_trait::async_trait]
impl LiveSession for LiveClient {
    fn set_model(&self, model: &str) {
        if self.status() == ConnectionStatus::Connected {
            tracing::warn!("model change takes effect on the next connection");
        }
        *lock(&self.model) = model.to_owned();
    }

    fn set_config(&self, config: LiveConnectConfig) {
        if self.status() == ConnectionStatus::Connected {
            tracing::warn!("config change takes effect on the next connection");
        }
        *lock(&self.config) = config;
    }

    async fn send_tool_response(&self, response: LiveToolResponse) -> Result<()> {
        let json = serde_json::to_string(&ClientMessage::ToolResponse(response))?;
        let outbound = lock(&self.outbound);
        let tx = outbound.as_ref().ok_or(AltairError::SessionClosed)?;
        tx.send(json).map_err(|_| AltairError::SessionClosed)
    }

    fn subscribe_tool_calls(&self) -> mpsc::UnboundedReceiver<LiveServerToolCall> {
        self.tool_calls.subscribe()
    }
}

/// Pump frames until the server closes or the client disconnects.
///
/// Returns `Ok(())` on a client-initiated close.
async fn connection_loop<W, R>(
    mut write: W,
    mut read: R,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    tool_calls: &ToolCallSubscribers,
    status: &Mutex<ConnectionStatus>,
) -> std::result::Result<(), String>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_frame(&text, tool_calls, status),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => handle_frame(text, tool_calls, status),
                        Err(e) => tracing::debug!("ignoring non-UTF-8 binary frame: {e}"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                        return Err(format!("connection closed by server: {reason}"));
                    }
                    None => return Err("connection closed by server".into()),
                    Some(Err(e)) => return Err(format!("read error: {e}")),
                    _ => {} // Ping/Pong frames handled by tungstenite.
                }
            }
            frame = outbound_rx.recv() => {
                match frame {
                    Some(json) => {
                        if let Err(e) = write.send(Message::Text(json)).await {
                            return Err(format!("send error: {e}"));
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn handle_frame(
    text: &str,
    tool_calls: &ToolCallSubscribers,
    status: &Mutex<ConnectionStatus>,
) {
    let event = match parse_server_message(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("ignoring unparseable server message: {e}");
            return;
        }
    };

    match event {
        ServerEvent::SetupComplete => {
            tracing::info!("live session setup complete");
            *lock(status) = ConnectionStatus::Connected;
        }
        ServerEvent::ToolCall(call) => {
            let count = call.function_calls.as_ref().map_or(0, Vec::len);
            tracing::debug!(function_calls = count, "tool call received");
            if tool_calls.publish(&call) == 0 {
                tracing::warn!("tool call dropped: no subscribers");
            }
        }
        ServerEvent::ToolCallCancellation { ids } => {
            tracing::debug!(?ids, "tool calls cancelled by server");
        }
        ServerEvent::Content {
            text,
            turn_complete,
            interrupted,
        } => {
            for t in &text {
                tracing::debug!(text = %t, "model text");
            }
            if interrupted {
                tracing::debug!("model turn interrupted");
            }
            if turn_complete {
                tracing::debug!("model turn complete");
            }
        }
        ServerEvent::GoAway { time_left } => {
            tracing::warn!(?time_left, "server is closing the live session soon");
        }
        ServerEvent::Unknown => {}
    }
}
