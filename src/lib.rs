//! altair-live: chart rendering for real-time voice AI sessions.
//!
//! A live session is configured with a persona and a `render_altair` tool.
//! When the model calls the tool, the chart specification it passes is
//! rendered through a pluggable embedding backend:
//!
//! - **Session**: [`live::LiveSession`], implemented by the WebSocket
//!   [`live::LiveClient`] and the in-process [`live::LoopbackSession`]
//! - **Widget**: [`widget::AltairWidget`] configures the session, listens for
//!   tool calls and acknowledges them
//! - **Chart**: [`chart::ChartRenderer`] parses specifications and hands them
//!   to a [`chart::ChartEmbedder`] such as [`chart::VegaHtmlEmbedder`]

pub mod chart;
pub mod config;
pub mod error;
pub mod live;
pub mod persona;
pub mod widget;

pub use config::AltairConfig;
pub use error::{AltairError, Result};
pub use widget::{AltairWidget, SessionSettings};
