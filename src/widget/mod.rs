//! The chart widget: wires the session configurator, the tool-call listener
//! and the chart renderer together for the widget's active lifetime.
//!
//! ```text
//! session ──toolCall──▶ listener ──pending spec (watch)──▶ render loop ──▶ embedder
//!            ◀──────── delayed acknowledgment (timer task)
//! ```

pub mod configurator;
pub mod listener;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chart::{ChartRenderer, PendingChart, RenderOutcome};
use crate::error::{AltairError, Result};
use crate::live::LiveSession;
use crate::live::types::LiveServerToolCall;

pub use configurator::{SessionSettings, configure_session};
pub use listener::{ToolCallListener, acknowledgments, extract_chart_spec};

/// A mounted chart widget.
///
/// Mounting configures the session and subscribes to its tool calls;
/// [`unmount`](Self::unmount) (or dropping the widget) releases the
/// subscription. Acknowledgments scheduled before that still fire.
pub struct AltairWidget {
    pending: watch::Receiver<PendingChart>,
    renders: watch::Receiver<u64>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<()>>>,
}

impl AltairWidget {
    /// Configure `session`, subscribe to its tool calls and start rendering.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        session: Arc<dyn LiveSession>,
        renderer: ChartRenderer,
        settings: &SessionSettings,
    ) -> Self {
        configure_session(session.as_ref(), settings);

        let (pending_tx, pending_rx) = watch::channel(PendingChart::Empty);
        let (renders_tx, renders_rx) = watch::channel(0u64);
        let cancel = CancellationToken::new();

        // Subscribe before returning so no event emitted after mount is missed.
        let tool_calls = session.subscribe_tool_calls();
        let listener = ToolCallListener::new(session, pending_tx, settings.ack_delay);

        let task = tokio::spawn(run_widget(
            listener,
            tool_calls,
            renderer,
            pending_rx.clone(),
            renders_tx,
            cancel.clone(),
        ));
        info!("chart widget mounted");

        Self {
            pending: pending_rx,
            renders: renders_rx,
            cancel,
            task: Some(task),
        }
    }

    /// The most recently received chart specification as text (empty until
    /// the first call).
    pub fn pending_spec(&self) -> String {
        self.pending.borrow().as_text().to_owned()
    }

    /// The most recently received `render_altair` argument.
    pub fn pending_chart(&self) -> PendingChart {
        self.pending.borrow().clone()
    }

    /// Number of charts rendered so far.
    pub fn render_count(&self) -> u64 {
        *self.renders.borrow()
    }

    /// Watch the render count; changes after every successful render.
    pub fn subscribe_renders(&self) -> watch::Receiver<u64> {
        self.renders.clone()
    }

    /// Whether the widget is still listening and rendering.
    ///
    /// Turns false after a render failure stops the pipeline.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop listening, finish any pending render and return the pipeline result.
    ///
    /// # Errors
    ///
    /// Returns the render failure that stopped the widget, if any.
    pub async fn unmount(mut self) -> Result<()> {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let result = task
            .await
            .map_err(|e| AltairError::Pipeline(format!("widget task failed: {e}")))?;
        info!("chart widget unmounted");
        result
    }
}

impl Drop for AltairWidget {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run the listener and render loop until the listener stops, then drain the
/// last pending specification. A render failure ends both immediately.
async fn run_widget(
    listener: ToolCallListener,
    tool_calls: mpsc::UnboundedReceiver<LiveServerToolCall>,
    renderer: ChartRenderer,
    pending: watch::Receiver<PendingChart>,
    renders: watch::Sender<u64>,
    cancel: CancellationToken,
) -> Result<()> {
    let listen = listener.run(tool_calls, cancel);
    let render = render_loop(renderer, pending, renders);
    tokio::pin!(listen);
    tokio::pin!(render);

    tokio::select! {
        result = &mut render => result,
        () = &mut listen => render.await,
    }
}

/// Render every change of the pending specification until its sender is dropped.
///
/// Embedders may block on I/O, so each render runs on the blocking pool.
async fn render_loop(
    renderer: ChartRenderer,
    mut pending: watch::Receiver<PendingChart>,
    renders: watch::Sender<u64>,
) -> Result<()> {
    while pending.changed().await.is_ok() {
        let chart = pending.borrow_and_update().clone();
        let worker = renderer.clone();
        let outcome = tokio::task::spawn_blocking(move || worker.render_pending(&chart))
            .await
            .map_err(|e| AltairError::Pipeline(format!("render task failed: {e}")))?;
        match outcome {
            Ok(RenderOutcome::Rendered) => {
                renders.send_modify(|n| *n += 1);
                info!(
                    document = %renderer.mount().document.display(),
                    "chart rendered"
                );
            }
            Ok(RenderOutcome::Skipped) => {}
            Err(e) => {
                error!("chart render failed: {e}");
                return Err(e);
            }
        }
    }
    Ok(())
}
