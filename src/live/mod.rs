//! Live session plumbing: wire types, the [`LiveSession`] seam and its
//! WebSocket and in-process implementations.

pub mod client;
pub mod loopback;
pub mod replay;
pub mod session;
pub mod types;

pub use client::{ConnectionStatus, LiveClient};
pub use loopback::LoopbackSession;
pub use session::{LiveSession, ToolCallSubscribers};
