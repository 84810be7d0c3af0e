use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use solroute_api::automation::PumpAutomation;
use solroute_api::config::AppConfig;
use solroute_api::db::{PgCredentialStore, PgOperationStore};
use solroute_api::traits::TokioSleeper;
use solroute_api::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting solroute-api");

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.database_max_connections,
        "Connected to database"
    );

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Migrations complete");

    let state = Arc::new(AppState::new(
        Arc::new(PgOperationStore::new(pool.clone())),
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PumpAutomation::new(config.pump.clone())),
        Arc::new(TokioSleeper),
    ));

    let app = build_router(state.clone(), &config.allowed_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight batches reach their next status check or finish.
    let pending = state.scheduler.in_flight_ids().await;
    if !pending.is_empty() {
        tracing::info!(
            count = pending.len(),
            operation_ids = ?pending,
            grace_secs = config.shutdown_grace.as_secs(),
            "Waiting for batch runs"
        );
        match tokio::time::timeout(config.shutdown_grace, state.scheduler.drain()).await {
            Ok(reports) => tracing::info!(completed = reports.len(), "Batch runs drained"),
            Err(_) => tracing::warn!("Shutdown grace elapsed with batch runs still in flight"),
        }
    }

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
