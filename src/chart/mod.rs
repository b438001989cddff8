//! Chart rendering: the `render_altair` declaration, the renderer and the
//! embedding backends it drives.

pub mod declaration;
pub mod embed;
pub mod renderer;

pub use declaration::{JSON_GRAPH_ARG, RENDER_ALTAIR, render_altair_declaration, session_tools};
pub use embed::{ChartEmbedder, MountPoint, VegaHtmlEmbedder};
pub use renderer::{ChartRenderer, PendingChart, RenderOutcome, parse_chart_spec};
