//! expel-api - ExpelAI detection service
//!
//! Stores pest detections and sensor readings for the monitoring dashboard
//! and grades uploaded leaf images through an external multimodal model.

use anyhow::{Context, Result};
use clap::Parser;
use expel_api::config::{Args, ServiceConfig};
use expel_api::db::{self, RecordStore, SqliteRecordStore};
use expel_api::services::{GeminiGateway, IngestionPipeline, PipelineOptions, UploadStore};
use expel_api::{build_router, AppState, HttpSettings};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::load(args).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("expel_api={0},expel_common={0},tower_http={0}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ExpelAI API (expel-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Root folder: {}", config.root_folder.display());

    expel_common::config::ensure_root_layout(&config.root_folder)
        .context("Failed to initialize root folder")?;

    info!("Database: {}", config.db_path.display());
    let pool = db::init_database_pool(&config.db_path)
        .await
        .context("Failed to open database")?;
    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(pool));

    if config.api_key.is_none() {
        warn!("GEMINI_API_KEY is not configured; detection requests will fail until it is set");
    }
    let gateway = GeminiGateway::new(
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.clone(),
        config.inference_timeout,
    )
    .context("Failed to build model API client")?;
    info!("Inference model: {} (timeout {:?})", config.model, config.inference_timeout);

    let pipeline = IngestionPipeline::new(
        Arc::new(gateway),
        store.clone(),
        UploadStore::new(config.uploads_dir.clone()),
        PipelineOptions {
            inference_timeout: config.inference_timeout,
            cleanup_failed_uploads: config.cleanup_failed_uploads,
        },
    );

    let state = AppState::new(
        store,
        Arc::new(pipeline),
        HttpSettings {
            allowed_origins: config.allowed_origins.clone(),
            max_upload_bytes: config.max_upload_bytes,
        },
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("expel-api listening on http://{}", config.bind_addr);
    info!("Status check: http://{}/api/status", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
