//! Live session trait: the seam between the widget and the session client.
//!
//! [`LiveSession`] is implemented by the WebSocket [`LiveClient`](super::client::LiveClient)
//! and the in-process [`LoopbackSession`](super::loopback::LoopbackSession), so the
//! widget works identically against a real connection or a recorded replay.

use std::sync::Mutex;

use tokio::sync::mpsc;

use super::types::{LiveConnectConfig, LiveServerToolCall, LiveToolResponse};
use crate::error::Result;

/// A long-lived conversational session that can invoke host tools.
///
/// Sessions are shared behind `Arc` and owned by the caller; consumers only
/// read from them and issue commands.
#[async_trait::async_trait]
pub trait LiveSession: Send + Sync {
    /// Select the model used for the next connection.
    fn set_model(&self, model: &str);

    /// Replace the session-wide configuration used for the next connection.
    fn set_config(&self, config: LiveConnectConfig);

    /// Reply to one or more function calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the transport fails.
    async fn send_tool_response(&self, response: LiveToolResponse) -> Result<()>;

    /// Subscribe to tool-call events.
    ///
    /// Every event published after this call is delivered in order. The
    /// subscription lasts as long as the returned receiver; dropping it
    /// unsubscribes.
    fn subscribe_tool_calls(&self) -> mpsc::UnboundedReceiver<LiveServerToolCall>;
}

type ToolCallSender = mpsc::UnboundedSender<LiveServerToolCall>;

/// Tool-call fan-out shared by session implementations.
///
/// Each subscriber gets its own unbounded queue, so a slow subscriber never
/// loses events. Closed queues are pruned on the next publish.
#[derive(Default)]
pub struct ToolCallSubscribers {
    senders: Mutex<Vec<ToolCallSender>>,
}

impl ToolCallSubscribers {
    pub fn new() -> Self {
        Self::default()
    }

    fn senders(&self) -> std::sync::MutexGuard<'_, Vec<ToolCallSender>> {
        match self.senders.lock() {
            Ok(s) => s,
            Err(p) => p.into_inner(),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LiveServerToolCall> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber. Returns the number reached.
    pub fn publish(&self, event: &LiveServerToolCall) -> usize {
        let mut senders = self.senders();
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        senders.len()
    }

    /// Number of subscribers whose receiver is still alive.
    pub fn count(&self) -> usize {
        self.senders().iter().filter(|tx| !tx.is_closed()).count()
    }
}
