use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamsaver_core::{
    load_config_or_default, validate_config, Fetcher, JobOrchestrator, JobRegistry,
    OrchestratorConfig, RetentionSweeper, YtDlpFetcher,
};
use streamsaver_server::api::create_router;
use streamsaver_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Directory of the running binary; relative storage paths live under it.
fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("STREAMSAVER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration; a missing file means built-in defaults
    info!("Loading configuration from {:?}", config_path);
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?
        .resolve_paths(&install_dir());

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "StreamSaver {} configuration loaded (hash {})",
        VERSION,
        &config_hash[..16]
    );
    info!("Downloads directory: {:?}", config.storage.downloads_dir);
    info!("Working directory: {:?}", config.storage.work_dir);

    for dir in [&config.storage.downloads_dir, &config.storage.work_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {:?}", dir))?;
    }

    // Create fetcher. A missing yt-dlp is not fatal; jobs report it.
    let fetcher = YtDlpFetcher::new(config.fetcher.clone());
    info!("Using fetcher binary {:?}", fetcher.binary());
    if let Err(e) = fetcher.validate().await {
        warn!("{}; downloads will fail until it is installed", e);
    }
    let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);

    // Job registry and orchestrator
    let registry = Arc::new(JobRegistry::new());
    let orchestrator = Arc::new(JobOrchestrator::new(
        OrchestratorConfig::from_config(&config),
        fetcher,
        Arc::clone(&registry),
    ));

    // Retention sweeper
    let sweeper = RetentionSweeper::new(
        Arc::clone(&registry),
        &config.storage.downloads_dir,
        &config.retention,
    );
    sweeper.start();

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, orchestrator));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    sweeper.stop();

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
