use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arxivist_core::{
    load_config, validate_config, Fetcher, HttpFetcher, Pdf2zhTranslator, StorageLayout,
    Translator,
};
use arxivist_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often idle sessions are purged
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
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
    let config_path = std::env::var("ARXIVIST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Configuration loaded successfully");
    info!("Data directory: {:?}", config.storage.data_dir);

    // Prepare the data directory
    let layout = StorageLayout::from_config(&config.storage);
    layout
        .ensure_dirs()
        .with_context(|| format!("Failed to create data directory {:?}", layout.root()))?;

    // Collaborators
    let fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpFetcher::new(&config.fetch).context("Failed to create HTTP client")?);
    let translator = Pdf2zhTranslator::new(config.translate.clone());
    match translator.validate().await {
        Ok(()) => info!("Using translator: {}", translator.name()),
        Err(e) => warn!(
            "Translator {} is not usable yet, translate tasks will fail: {}",
            translator.name(),
            e
        ),
    }
    let translator: Arc<dyn Translator> = Arc::new(translator);

    // Create app state
    let state = Arc::new(AppState::from_config(config.clone(), fetcher, translator));
    let orchestrator = state.orchestrator().clone();

    // Markers left by a crashed run
    let reclaimed = orchestrator.locks().reclaim_stale();
    if !reclaimed.is_empty() {
        info!(count = reclaimed.len(), "Reclaimed stale locks at startup");
    }

    // Periodic maintenance
    let reclaim_interval = config.locks.reclaim_interval();
    let maintenance = tokio::spawn(async move {
        let tick = reclaim_interval
            .map_or(SESSION_PURGE_INTERVAL, |i| i.min(SESSION_PURGE_INTERVAL));
        let mut interval = tokio::time::interval(tick);
        interval.tick().await;
        loop {
            interval.tick().await;
            if reclaim_interval.is_some() {
                let reclaimed = orchestrator.locks().reclaim_stale();
                if !reclaimed.is_empty() {
                    info!(keys = ?reclaimed, "Reclaimed stale locks");
                }
            }
            let purged = orchestrator.sessions().purge_expired();
            debug!(purged, "Session purge");
        }
    });

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    maintenance.abort();
    info!("Server shut down");

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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
