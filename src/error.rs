//! Error types for the altair-live bridge.

/// Top-level error type for the chart bridge.
#[derive(Debug, thiserror::Error)]
pub enum AltairError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persona script could not be loaded.
    #[error("persona error: {0}")]
    Persona(String),

    /// The pending chart argument is not a string holding a JSON object.
    #[error("malformed chart specification: {0}")]
    MalformedChart(String),

    /// The embedding backend failed to render a chart.
    #[error("embed error: {0}")]
    Embed(String),

    /// The live session no longer accepts commands.
    #[error("session closed")]
    SessionClosed,

    /// Widget task coordination error.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// WebSocket transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// A recorded tool-call line could not be parsed.
    #[error("replay error at line {line}: {message}")]
    Replay { line: usize, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error outside of chart parsing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AltairError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = AltairError::MalformedChart("expected value at line 1".into());
        assert_eq!(
            err.to_string(),
            "malformed chart specification: expected value at line 1"
        );
        assert_eq!(AltairError::SessionClosed.to_string(), "session closed");
        let replay = AltairError::Replay {
            line: 3,
            message: "EOF while parsing".into(),
        };
        assert_eq!(replay.to_string(), "replay error at line 3: EOF while parsing");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AltairError = io.into();
        assert!(matches!(err, AltairError::Io(_)));
    }
}
