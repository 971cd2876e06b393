//! Server assembly and lifecycle.
//!
//! Wires the repository trio, parser registry, queue, worker pool, and HTTP
//! router together, then runs until SIGINT/SIGTERM. On shutdown the HTTP
//! listener drains first, then the worker pool is cancelled and awaited;
//! imports interrupted mid-run stay visible as stale `Processing` jobs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::{Config, StorageBackend};
use crate::features::{self, FeatureState};
use crate::ingest::{job_queue, ImportSubmission, IngestWorkerPool};
use crate::parser::ParserRegistry;
use crate::repo::Repositories;

/// Run the server until a shutdown signal arrives.
pub async fn serve(config: Config) -> Result<()> {
    let repos = match config.ingest.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
                .connect(&config.database.url)
                .await
                .context("failed to connect to the database")?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Database connection pool established");
            Repositories::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Running on the in-memory backing; state is lost on restart");
            Repositories::in_memory()
        }
    };

    let registry = Arc::new(ParserRegistry::new());
    let (queue, receiver) = job_queue(config.ingest.queue_capacity);
    let submission = Arc::new(ImportSubmission::new(
        registry.clone(),
        queue,
        repos.jobs.clone(),
    ));

    let pool_handle =
        IngestWorkerPool::new(receiver, registry.clone(), repos.clone(), &config.ingest).start();

    let state = FeatureState {
        repos,
        registry,
        submission,
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // HTTP has drained; stop accepting work and wait out in-flight imports.
    pool_handle.shutdown().await;
    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn create_router(state: FeatureState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", features::router(state))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Rowhouse",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
