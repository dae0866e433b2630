use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transmute_core::{
    load_config, validate_config, ConversionService, ConverterRegistry, WorkDir,
};
use transmute_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("TRANSMUTE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!(version = VERSION, "Starting transmute");
    info!("Configuration loaded from {:?}", config_path);

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // Prepare the working directory (creates it and purges leftovers)
    let workdir = Arc::new(
        WorkDir::prepare(&config.workspace.temp_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to prepare working directory {:?}",
                    config.workspace.temp_dir
                )
            })?,
    );

    // Register converters
    let registry = Arc::new(ConverterRegistry::with_defaults(&config.engines));
    info!(converters = ?registry.names(), "Converters registered");

    let service = ConversionService::new(
        registry,
        Arc::clone(&workdir),
        config.workspace.max_parallel_conversions,
    );
    info!(
        max_parallel = config.workspace.max_parallel_conversions,
        timeout_secs = config.engines.timeout_secs,
        "Conversion service ready"
    );

    // Create app state and router
    let max_upload_bytes = config.server.max_upload_bytes();
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, service));
    let app = create_router(state, max_upload_bytes);

    // Start server
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
    if let Err(e) = workdir.teardown().await {
        warn!(error = %e, root = %workdir.root().display(), "Failed to remove working directory");
    }

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
