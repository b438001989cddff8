//! In-process live session.
//!
//! [`LoopbackSession`] has no transport: tool-call events are injected with
//! [`LoopbackSession::emit_tool_call`] and tool responses are recorded. The
//! binary uses it to replay captured tool calls, and tests use it as the
//! session double.

use std::sync::Mutex;

use tokio::sync::mpsc;

use super::session::{LiveSession, ToolCallSubscribers};
use super::types::{LiveConnectConfig, LiveServerToolCall, LiveToolResponse};
use crate::error::{AltairError, Result};

#[derive(Default)]
struct LoopbackState {
    model: Option<String>,
    config: Option<LiveConnectConfig>,
    responses: Vec<LiveToolResponse>,
    closed: bool,
}

/// A session that loops tool calls back to local subscribers.
pub struct LoopbackSession {
    tool_calls: ToolCallSubscribers,
    state: Mutex<LoopbackState>,
}

impl LoopbackSession {
    /// Create an open session with no subscribers.
    pub fn new() -> Self {
        Self {
            tool_calls: ToolCallSubscribers::new(),
            state: Mutex::new(LoopbackState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        match self.state.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        }
    }

    /// Publish a tool-call event. Returns the number of subscribers reached.
    pub fn emit_tool_call(&self, event: LiveServerToolCall) -> usize {
        self.tool_calls.publish(&event)
    }

    /// Number of live tool-call subscriptions.
    pub fn tool_call_subscribers(&self) -> usize {
        self.tool_calls.count()
    }

    /// The model selected via [`LiveSession::set_model`], if any.
    pub fn model(&self) -> Option<String> {
        self.state().model.clone()
    }

    /// The configuration set via [`LiveSession::set_config`], if any.
    pub fn config(&self) -> Option<LiveConnectConfig> {
        self.state().config.clone()
    }

    /// Every tool response received so far, in arrival order.
    pub fn responses(&self) -> Vec<LiveToolResponse> {
        self.state().responses.clone()
    }

    /// Stop accepting tool responses.
    pub fn close(&self) {
        self.state().closed = true;
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

impl Default for LoopbackSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LiveSession for LoopbackSession {
    fn set_model(&self, model: &str) {
        self.state().model = Some(model.to_owned());
    }

    fn set_config(&self, config: LiveConnectConfig) {
        self.state().config = Some(config);
    }

    async fn send_tool_response(&self, response: LiveToolResponse) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(AltairError::SessionClosed);
        }
        tracing::debug!(
            responses = response.function_responses.len(),
            "loopback session received tool response"
        );
        state.responses.push(response);
        Ok(())
    }

    fn subscribe_tool_calls(&self) -> mpsc::UnboundedReceiver<LiveServerToolCall> {
        self.tool_calls.subscribe()
    }
}
