//! Replay of recorded tool calls through a [`LoopbackSession`].
//!
//! A recording holds one JSON object per line: either a full
//! `{"toolCall": ...}` server frame or a bare tool-call object. Blank lines
//! and lines starting with `#` are skipped.

use tracing::warn;

use super::client::{ServerEvent, parse_server_message};
use super::loopback::LoopbackSession;
use super::types::LiveServerToolCall;
use crate::error::{AltairError, Result};

/// Parse one recorded line. Calls without an id get a fresh one.
///
/// # Errors
///
/// Returns a JSON error if the line is neither a server frame nor a tool call.
pub fn parse_replay_line(line: &str) -> Result<LiveServerToolCall> {
    let mut event = match parse_server_message(line)? {
        ServerEvent::ToolCall(call) => call,
        _ => serde_json::from_str::<LiveServerToolCall>(line)?,
    };
    if let Some(calls) = event.function_calls.as_mut() {
        for call in calls.iter_mut().filter(|c| c.id.is_empty()) {
            call.id = uuid::Uuid::new_v4().to_string();
        }
    }
    Ok(event)
}

/// Parse a whole recording.
///
/// # Errors
///
/// Returns [`AltairError::Replay`] naming the first line that fails to parse.
pub fn parse_recording(content: &str) -> Result<Vec<LiveServerToolCall>> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| {
            parse_replay_line(text).map_err(|e| AltairError::Replay {
                line,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Emit `events` in order, stopping once nobody is subscribed.
///
/// Returns the number of events that reached a subscriber.
pub async fn replay_events<I>(session: &LoopbackSession, events: I) -> usize
where
    I: IntoIterator<Item = LiveServerToolCall>,
{
    let mut delivered = 0;
    for event in events {
        if session.emit_tool_call(event) == 0 {
            warn!(delivered, "no tool call subscribers left; replay stopped");
            break;
        }
        delivered += 1;
        tokio::task::yield_now().await;
    }
    delivered
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::live::LiveSession;

    const RECORDING: &str = r#"
# two charts
{"toolCall":{"functionCalls":[{"id":"1","name":"render_altair","args":{"json_graph":"{}"}}]}}

{"functionCalls":[{"name":"render_altair","args":{"json_graph":"{}"}}]}
"#;

    #[test]
    fn parses_frames_and_bare_calls() {
        let events = parse_recording(RECORDING).unwrap();
        assert_eq!(events.len(), 2);
        let first = events[0].function_calls.as_ref().unwrap();
        assert_eq!(first[0].id, "1");
        let second = events[1].function_calls.as_ref().unwrap();
        assert!(!second[0].id.is_empty());
    }

    #[test]
    fn bad_line_reports_its_number() {
        let err = parse_recording("# header\n{\"functionCalls\":[]}\nnot json\n").unwrap_err();
        assert!(matches!(err, AltairError::Replay { line: 3, .. }), "{err}");
    }

    #[tokio::test]
    async fn counts_only_delivered_events() {
        let session = LoopbackSession::new();
        let events = parse_recording(RECORDING).unwrap();

        assert_eq!(replay_events(&session, events.clone()).await, 0);

        let mut rx = session.subscribe_tool_calls();
        assert_eq!(replay_events(&session, events.clone()).await, 2);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());

        drop(rx);
        assert_eq!(replay_events(&session, events).await, 0);
    }
}
