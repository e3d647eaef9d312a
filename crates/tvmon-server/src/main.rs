use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tvmon_collector::ProcfsSource;

use tvmon_server::app;
use tvmon_server::config::ServerConfig;
use tvmon_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tvmon-server [config.toml]    Start the sidecar (default: config/tvmon.toml)");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tvmon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        other => run_server(other.unwrap_or("config/tvmon.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        channel_limit = config.channel_limit,
        tuner_limit = config.tuner_limit,
        targets = config.targets.len(),
        recipients = config.recipients.len(),
        auth = config.api_key.is_some(),
        "tvmon-server starting"
    );

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let state = AppState::new(
        config,
        Some(PathBuf::from(config_path)),
        Box::new(ProcfsSource::new()),
    )?;
    let exit_requested = state.host.shutdown_signal();

    let app = app::build_http_app(state.clone());
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(addr = %http_addr, "HTTP server listening");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => tracing::info!("Shutting down"),
                _ = exit_requested.notified() => tracing::info!("Exit requested, shutting down"),
            }
        })
        .await?;

    state.channels.clear();
    state.tuners.clear();
    tracing::info!("tvmon-server stopped");
    Ok(())
}
