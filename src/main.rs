//! EventHub gateway: real-time notification and dashboard socket server.
//!
//! Wires configuration, the statistics store, the message bus and the
//! real-time engine together, then serves `/ws` until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use eventhub_api::{AppState, build_app};
use eventhub_bus::BusManager;
use eventhub_core::config::AppConfig;
use eventhub_core::error::AppError;
use eventhub_core::events::BusChannels;
use eventhub_database::{DatabasePool, StatsRepository};
use eventhub_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Gateway error");
        std::process::exit(1);
    }
}

/// Load configuration for `EVENTHUB_ENV` (default `development`).
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("EVENTHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
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

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting EventHub gateway v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    let db = DatabasePool::connect(&config.database).await?;
    let stats = Arc::new(StatsRepository::new(db.pool().clone()));

    tracing::info!(provider = %config.bus.provider, "Initializing message bus");
    let bus = BusManager::new(&config.bus).await?;

    let engine = RealtimeEngine::new(
        &config.realtime,
        &config.auth,
        Arc::new(bus),
        BusChannels::from_config(&config.bus),
        stats,
    );
    engine.start().await?;

    let app = build_app(AppState::new(config.clone(), engine.clone()));

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("EventHub gateway listening on {}", addr);

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let closing = engine.clone();
    let bus_lost = engine.bus_lost_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    tracing::info!("Shutdown signal received, closing sockets");
                }
                _ = bus_lost.cancelled() => {
                    tracing::error!("Bus subscription lost, closing sockets");
                }
            }
            match tokio::time::timeout(grace, closing.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Engine shutdown failed"),
                Err(_) => tracing::warn!(?grace, "Engine shutdown exceeded grace period"),
            }
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    db.close().await;
    if engine.bus_lost_token().is_cancelled() {
        return Err(AppError::service_unavailable("Bus subscription lost"));
    }
    tracing::info!("EventHub gateway shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
