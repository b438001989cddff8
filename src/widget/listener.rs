//! Tool-call listener: turns `render_altair` calls into pending chart
//! specifications and acknowledges every call after a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chart::{JSON_GRAPH_ARG, PendingChart, RENDER_ALTAIR};
use crate::live::LiveSession;
use crate::live::types::{FunctionResponse, LiveServerToolCall, LiveToolResponse};

/// Pull the chart specification out of a tool-call event.
///
/// Only the first `render_altair` call is used. The argument is not parsed
/// here: a string is kept verbatim, and a missing or non-string value is
/// marked so that rendering it fails.
pub fn extract_chart_spec(event: &LiveServerToolCall) -> Option<PendingChart> {
    let call = event
        .function_calls
        .as_ref()?
        .iter()
        .find(|c| c.name == RENDER_ALTAIR)?;
    Some(match call.args.get(JSON_GRAPH_ARG) {
        Some(Value::String(s)) => PendingChart::Spec(s.clone()),
        Some(other) => PendingChart::NotAString(other.to_string()),
        None => PendingChart::NotAString(Value::Null.to_string()),
    })
}

/// Build the acknowledgment for every call in `event`, matched or not.
///
/// Returns `None` when the event carries no calls.
pub fn acknowledgments(event: &LiveServerToolCall) -> Option<LiveToolResponse> {
    let calls = event.function_calls.as_ref().filter(|c| !c.is_empty())?;
    Some(LiveToolResponse {
        function_responses: calls.iter().map(FunctionResponse::success).collect(),
    })
}

/// Send `response` to `session` after `delay` on a detached task.
///
/// The task holds its own session handle, so it still fires if the listener
/// is torn down in the meantime.
pub fn schedule_acknowledgment(
    session: Arc<dyn LiveSession>,
    response: LiveToolResponse,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let count = response.function_responses.len();
        match session.send_tool_response(response).await {
            Ok(()) => debug!(responses = count, "tool calls acknowledged"),
            Err(e) => warn!(responses = count, "tool call acknowledgment failed: {e}"),
        }
    })
}

/// Listens for tool calls on one session and updates the pending chart.
pub struct ToolCallListener {
    session: Arc<dyn LiveSession>,
    pending: watch::Sender<PendingChart>,
    ack_delay: Duration,
}

impl ToolCallListener {
    /// Create a listener writing into `pending`.
    pub fn new(
        session: Arc<dyn LiveSession>,
        pending: watch::Sender<PendingChart>,
        ack_delay: Duration,
    ) -> Self {
        Self {
            session,
            pending,
            ack_delay,
        }
    }

    /// Process one event.
    ///
    /// Returns the acknowledgment task, if one was scheduled.
    pub fn handle(&self, event: &LiveServerToolCall) -> Option<JoinHandle<()>> {
        let Some(calls) = event.function_calls.as_ref() else {
            debug!("tool call event without function calls ignored");
            return None;
        };
        debug!(function_calls = calls.len(), "tool call event");

        if let Some(spec) = extract_chart_spec(event) {
            let changed = self.pending.send_if_modified(|current| {
                if *current == spec {
                    false
                } else {
                    *current = spec;
                    true
                }
            });
            debug!(changed, "pending chart specification updated");
        }

        let response = acknowledgments(event)?;
        Some(schedule_acknowledgment(
            Arc::clone(&self.session),
            response,
            self.ack_delay,
        ))
    }

    /// Handle events from `rx` until it closes or `cancel` fires.
    ///
    /// Dropping `rx` on return ends the subscription.
    pub async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<LiveServerToolCall>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("tool call listener cancelled");
                    break;
                }
                event = rx.recv() => match event {
                    Some(event) => {
                        self.handle(&event);
                    }
                    None => {
                        debug!("tool call stream closed");
                        break;
                    }
                },
            }
        }
    }
}
