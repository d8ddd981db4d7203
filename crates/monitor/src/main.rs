//! Driver Fatigue Monitor - Main Entry Point
//!
//! Usage: fatigue-monitor [CONFIG_FILE] [INPUT]
//!
//! INPUT is a JSON-lines landmark file; `-` or absent reads stdin.

use alerting::LogAudioSink;
use anyhow::Context;
use dms::FatigueEngine;
use monitor::{init_logging, init_metrics, load_config, start_dispatcher, Monitor};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(String::as_str), Some("-h" | "--help")) {
        println!("Usage: {} [CONFIG_FILE] [INPUT]", args[0]);
        return Ok(());
    }

    let config_path = args.get(1).map(String::as_str).filter(|p| *p != "-");
    let config = load_config(config_path).context("loading configuration")?;
    init_logging(&config.logging);

    info!("=== Driver Fatigue Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    init_metrics(&config.metrics).context("starting metrics exporter")?;

    let engine = FatigueEngine::new(config.dms.clone()).context("creating fatigue engine")?;
    let dispatcher = start_dispatcher(&config.channel, &config.dispatch)
        .await
        .context("starting notification channel")?;
    let monitor = Monitor::new(engine, dispatcher, LogAudioSink::default());

    let input: Box<dyn AsyncBufRead + Unpin> = match args.get(2).map(String::as_str) {
        None | Some("-") => Box::new(BufReader::new(tokio::io::stdin())),
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening landmark input {}", path))?;
            Box::new(BufReader::new(file))
        }
    };

    let summary = monitor.run(input).await?;
    info!(
        frames = summary.engine.frames_processed,
        skipped = summary.lines_skipped,
        "Done"
    );
    Ok(())
}
