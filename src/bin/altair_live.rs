//! `altair-live`: render charts requested by a live voice session.
//!
//! Connects to the live API (or replays recorded tool calls with
//! `--replay`) and writes each requested chart to an HTML document.
//!
//! All tracing output goes to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use altair_live::chart::{ChartRenderer, MountPoint, VegaHtmlEmbedder};
use altair_live::live::replay::{parse_recording, replay_events};
use altair_live::live::{LiveClient, LiveSession, LoopbackSession};
use altair_live::{AltairConfig, AltairWidget, SessionSettings};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: altair-live [--config <path>] [--out <html>] [--replay <file.jsonl>] [--print-config]

  --config <path>       TOML config (default: <config dir>/altair-live/config.toml if present)
  --out <html>          chart document to write (overrides [chart] output)
  --replay <file>       replay recorded tool calls, one JSON object per line
  --print-config        print the effective config and exit";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    replay: Option<PathBuf>,
    print_config: bool,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = Some(next_path(&mut it, "--config")?),
            "--out" => args.out = Some(next_path(&mut it, "--out")?),
            "--replay" => args.replay = Some(next_path(&mut it, "--replay")?),
            "--print-config" => args.print_config = true,
            "-h" | "--help" => return Ok(None),
            other => anyhow::bail!("unknown argument: {other}\n\n{USAGE}"),
        }
    }
    Ok(Some(args))
}

fn next_path(it: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<PathBuf> {
    it.next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))
}

fn load_config(args: &Args) -> anyhow::Result<AltairConfig> {
    let mut config = match &args.config {
        Some(path) => AltairConfig::from_file(path)?,
        None => {
            let path = AltairConfig::default_config_path();
            if path.exists() {
                AltairConfig::from_file(&path)?
            } else {
                AltairConfig::default()
            }
        }
    };
    if let Some(out) = &args.out {
        config.chart.output = out.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("altair_live=info")),
        )
        .init();

    let Some(args) = parse_args()? else {
        println!("{USAGE}");
        return Ok(());
    };
    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let settings = SessionSettings::from_config(&config)?;
    let renderer = ChartRenderer::new(
        MountPoint::new(&config.chart.element_id, &config.chart.output),
        Arc::new(VegaHtmlEmbedder::new(&config.chart)),
    );

    match &args.replay {
        Some(path) => run_replay(path, renderer, &settings).await,
        None => run_live(&config, renderer, &settings).await,
    }
}

async fn run_live(
    config: &AltairConfig,
    renderer: ChartRenderer,
    settings: &SessionSettings,
) -> anyhow::Result<()> {
    let client = Arc::new(LiveClient::new(&config.live.endpoint, config.api_key()?));
    let session: Arc<dyn LiveSession> = client.clone();

    // Mount first: the setup message carries the widget's configuration.
    let widget = AltairWidget::mount(session, renderer, settings);
    client.connect().await?;
    println!(
        "altair-live v{} connected; charts are written to {}",
        env!("CARGO_PKG_VERSION"),
        config.chart.output.display()
    );

    let mut poll = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("interrupted");
                break;
            }
            _ = poll.tick() => {
                if !widget.is_active() {
                    break;
                }
            }
        }
    }

    let result = widget.unmount().await;
    client.disconnect().await;
    result?;
    Ok(())
}

async fn run_replay(
    path: &Path,
    renderer: ChartRenderer,
    settings: &SessionSettings,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let events = parse_recording(&content)
        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
    let session = Arc::new(LoopbackSession::new());
    let widget = AltairWidget::mount(session.clone(), renderer, settings);

    let emitted = replay_events(&session, events).await;

    // Let the last acknowledgments fire before tearing down.
    tokio::time::sleep(settings.ack_delay + Duration::from_millis(50)).await;
    let renders = widget.render_count();
    let result = widget.unmount().await;

    let acknowledged: usize = session
        .responses()
        .iter()
        .map(|r| r.function_responses.len())
        .sum();
    println!(
        "replayed {emitted} events, acknowledged {acknowledged} calls, rendered {renders} charts"
    );
    result?;
    Ok(())
}
