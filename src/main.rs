//! AnnoHub Server: live annotation broadcast over HTTP long-polling.
//!
//! Main entry point that wires the broker and the HTTP gateway together.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use annohub_api::{AppState, build_router};
use annohub_core::config::AppConfig;
use annohub_core::error::AppError;
use annohub_realtime::Broker;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from `config/` files and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("ANNOHUB_CONFIG") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => {
            let env = std::env::var("ANNOHUB_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting AnnoHub");

    let broker = Broker::new(config.broker.clone(), &config.persistence);
    broker.start()?;

    match &config.persistence.store_directory {
        Some(dir) => tracing::info!(
            directory = %dir.display(),
            file = %config.persistence.file_name,
            "Annotation log enabled"
        ),
        None => tracing::info!("No store directory configured, annotations kept in memory only"),
    }

    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let app = build_router(AppState::new(config, broker.clone()));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(address = %addr, "AnnoHub server listening");

    // Stopping the broker on signal releases parked long-polls so the
    // server's graceful shutdown is not held up by them.
    let signal_broker = broker.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        if let Err(e) = signal_broker.stop(grace).await {
            tracing::error!(error = %e, "Broker shutdown failed");
        }
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // No-op when the signal path already stopped the broker.
    broker.stop(grace).await?;

    tracing::info!("AnnoHub server shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
