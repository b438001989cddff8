//! Chart renderer: parses pending specifications and hands them to the
//! embedding backend.

use std::sync::Arc;

use serde_json::Value;

use super::embed::{ChartEmbedder, MountPoint};
use crate::error::{AltairError, Result};

/// Result of a render attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The pending specification was empty; nothing was drawn.
    Skipped,
    /// The embedder drew the chart.
    Rendered,
}

/// The chart argument of the most recent `render_altair` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PendingChart {
    /// No call received yet.
    #[default]
    Empty,
    /// A string argument, kept verbatim.
    Spec(String),
    /// A missing or non-string argument, as JSON text (`null` when missing).
    /// Never rendered.
    NotAString(String),
}

impl PendingChart {
    /// The pending argument as text; empty before the first call.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Spec(text) | Self::NotAString(text) => text,
        }
    }
}

/// Renders chart specifications into one exclusively owned mount point.
#[derive(Clone)]
pub struct ChartRenderer {
    mount: MountPoint,
    embedder: Arc<dyn ChartEmbedder>,
}

impl ChartRenderer {
    /// Create a renderer drawing into `mount` via `embedder`.
    pub fn new(mount: MountPoint, embedder: Arc<dyn ChartEmbedder>) -> Self {
        Self { mount, embedder }
    }

    /// The mount point this renderer writes to.
    pub fn mount(&self) -> &MountPoint {
        &self.mount
    }

    /// Parse `pending` and render it.
    ///
    /// # Errors
    ///
    /// Returns [`AltairError::MalformedChart`] if `pending` is not a JSON
    /// object, or the embedder's error if drawing fails.
    pub fn render(&self, pending: &str) -> Result<RenderOutcome> {
        if pending.is_empty() {
            return Ok(RenderOutcome::Skipped);
        }
        let spec = parse_chart_spec(pending)?;
        self.embedder.embed(&self.mount, &spec)?;
        Ok(RenderOutcome::Rendered)
    }

    /// Render the pending `render_altair` argument.
    ///
    /// # Errors
    ///
    /// Returns [`AltairError::MalformedChart`] for a missing or non-string
    /// argument, otherwise as [`render`](Self::render).
    pub fn render_pending(&self, pending: &PendingChart) -> Result<RenderOutcome> {
        match pending {
            PendingChart::Empty => Ok(RenderOutcome::Skipped),
            PendingChart::Spec(text) => self.render(text),
            PendingChart::NotAString(text) => Err(AltairError::MalformedChart(format!(
                "json_graph must be a string, got {text}"
            ))),
        }
    }
}

/// Parse a JSON-encoded chart specification.
///
/// # Errors
///
/// Returns [`AltairError::MalformedChart`] on invalid JSON or a non-object value.
pub fn parse_chart_spec(json: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| AltairError::MalformedChart(e.to_string()))?;
    if !value.is_object() {
        return Err(AltairError::MalformedChart(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEmbedder {
        calls: Mutex<Vec<(MountPoint, Value)>>,
    }

    impl ChartEmbedder for RecordingEmbedder {
        fn embed(&self, mount: &MountPoint, spec: &Value) -> Result<()> {
            self.calls.lock().unwrap().push((mount.clone(), spec.clone()));
            Ok(())
        }
    }

    struct FailingEmbedder;

    impl ChartEmbedder for FailingEmbedder {
        fn embed(&self, _mount: &MountPoint, _spec: &Value) -> Result<()> {
            Err(AltairError::Embed("no display".into()))
        }
    }

    fn renderer(embedder: Arc<dyn ChartEmbedder>) -> ChartRenderer {
        ChartRenderer::new(MountPoint::new("vega-embed", "chart.html"), embedder)
    }

    #[test]
    fn empty_spec_is_skipped() {
        let rec = Arc::new(RecordingEmbedder::default());
        let r = renderer(rec.clone());
        assert_eq!(r.render("").unwrap(), RenderOutcome::Skipped);
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn valid_spec_embeds_once_with_parsed_value() {
        let rec = Arc::new(RecordingEmbedder::default());
        let r = renderer(rec.clone());
        let spec = r#"{"mark":"bar","data":{"values":[{"a":1},{"a":2}]}}"#;

        assert_eq!(r.render(spec).unwrap(), RenderOutcome::Rendered);

        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, *r.mount());
        assert_eq!(
            calls[0].1,
            json!({ "mark": "bar", "data": { "values": [{ "a": 1 }, { "a": 2 }] } })
        );
    }

    #[test]
    fn invalid_json_is_malformed() {
        let rec = Arc::new(RecordingEmbedder::default());
        let r = renderer(rec.clone());
        let err = r.render("not valid json").unwrap_err();
        assert!(matches!(err, AltairError::MalformedChart(_)));
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn non_object_json_is_malformed() {
        for input in ["null", "42", "[1,2]", "\"{}\""] {
            let err = parse_chart_spec(input).unwrap_err();
            assert!(
                matches!(
                    err,
                    AltairError::MalformedChart(ref m) if m.starts_with("expected a JSON object")
                ),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn non_string_argument_is_never_rendered() {
        let rec = Arc::new(RecordingEmbedder::default());
        let r = renderer(rec.clone());

        let object = PendingChart::NotAString(r#"{"mark":"bar"}"#.into());
        let err = r.render_pending(&object).unwrap_err();
        assert!(matches!(
            err,
            AltairError::MalformedChart(ref m) if m.contains("must be a string")
        ));

        let missing = PendingChart::NotAString("null".into());
        assert!(matches!(
            r.render_pending(&missing),
            Err(AltairError::MalformedChart(_))
        ));
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn pending_string_renders_and_empty_skips() {
        let rec = Arc::new(RecordingEmbedder::default());
        let r = renderer(rec.clone());
        assert_eq!(
            r.render_pending(&PendingChart::Empty).unwrap(),
            RenderOutcome::Skipped
        );
        assert_eq!(
            r.render_pending(&PendingChart::Spec(r#"{"mark":"bar"}"#.into()))
                .unwrap(),
            RenderOutcome::Rendered
        );
        assert_eq!(rec.calls.lock().unwrap()[0].1, json!({ "mark": "bar" }));
        assert_eq!(PendingChart::Empty.as_text(), "");
        assert_eq!(PendingChart::NotAString("3".into()).as_text(), "3");
    }

    #[test]
    fn embedder_error_propagates() {
        let r = renderer(Arc::new(FailingEmbedder));
        let err = r.render(r#"{"mark":"line"}"#).unwrap_err();
        assert!(matches!(err, AltairError::Embed(_)));
    }
}
