//! Headless viewer for the Animus command stream.
//!
//! Renders the manifest's avatars into an in-memory scene and logs every
//! scene operation the command pipeline performs on them.

use animus_core::MemoryScene;
use animus_viewer::{
    client::{self, ViewerOptions},
    manifest,
};
use anyhow::Context;
use clap::Parser;
use std::{path::PathBuf, time::Duration};
use tracing::{Level, error, info};

#[derive(Parser, Debug)]
#[command(version, about = "Headless avatar viewer for the /anim command stream")]
struct Cli {
    /// WebSocket URL of the command stream.
    #[arg(long, default_value = "ws://localhost:5173/anim")]
    url: String,
    /// JSON list of avatar entities. A single default avatar is used when omitted.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Frames rendered per second.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=240))]
    fps: u32,
    #[arg(long, default_value = "info")]
    log_level: Level,
    #[arg(long, default_value_t = 2000)]
    initial_backoff_ms: u64,
    #[arg(long, default_value_t = 30000)]
    max_backoff_ms: u64,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal.");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    let entities = match &cli.manifest {
        Some(path) => manifest::load(path).context("Failed to load scene manifest")?,
        None => manifest::default_entities(),
    };
    info!(
        entities = ?entities.iter().map(|entity| entity.id.as_str()).collect::<Vec<_>>(),
        url = %cli.url,
        fps = cli.fps,
        "Starting viewer"
    );

    let options = ViewerOptions {
        url: cli.url,
        fps: cli.fps,
        initial_backoff: Duration::from_millis(cli.initial_backoff_ms),
        max_backoff: Duration::from_millis(cli.max_backoff_ms),
    };
    client::run(options, MemoryScene::new(entities), shutdown_signal()).await;
    Ok(())
}
