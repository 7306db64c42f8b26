//! Slate server - HTTP/WebSocket backend for collaborative whiteboards.

use anyhow::Result;
use clap::Parser;
use slate_core::spawn_sweeper;
use slate_server::logging::{self, LogConfig, LogFormat};
use slate_server::{app, config::Config, state::AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Slate server - realtime session router for team whiteboards.
#[derive(Parser, Debug)]
#[command(name = "slate-server")]
#[command(about = "HTTP/WebSocket server for collaborative whiteboards")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Override teams directory from config
    #[arg(long, value_name = "DIR")]
    teams_dir: Option<PathBuf>,

    /// Enable verbose logging (INFO for all targets)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g. "ws=debug" or
    /// "session=trace,flush=debug"). Targets are prefixed with "slate::".
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(teams_dir) = cli.teams_dir {
        config.teams_dir = teams_dir;
    }

    tracing::info!(
        target: "slate::startup",
        "Loaded configuration (port: {}, teams dir: {})",
        config.port,
        config.teams_dir.display()
    );

    let sweep_interval = config.sweep_interval();
    let state = Arc::new(AppState::new(config.clone()).await?);
    tracing::info!(target: "slate::startup", "Initialized application state");

    spawn_sweeper(state.registry.clone(), sweep_interval);
    tracing::info!(target: "slate::startup", "Started idle-session sweeper");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(target: "slate::startup", "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
