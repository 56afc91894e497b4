use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use flip_relay::{build_state, config::Config, create_router, utils::init_logger};

/// File upload relay backed by local disk or an S3-compatible bucket
#[derive(Debug, Parser)]
#[command(name = "flip-relay", version, about)]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Storage backend: local or s3 (overrides STORAGE_PROVIDER)
    #[arg(long)]
    storage: Option<String>,

    /// Directory for the local backend (overrides UPLOAD_DIR)
    #[arg(long)]
    upload_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(storage) = cli.storage {
        config.storage.provider = storage.parse()?;
    }
    if let Some(dir) = cli.upload_dir {
        config.storage.upload_dir = dir;
    }
    config.validate()?;

    let _log_guard = init_logger(&config.log);
    info!("Configuration loaded: {:?}", config.server);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));

    // Create shared state
    let state = build_state(config).await?;

    // Create router
    let app = create_router(state);

    // Start server
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
