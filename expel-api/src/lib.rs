//! expel-api library
//!
//! Pest detection ingestion and record API for the ExpelAI dashboard.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::db::RecordStore;
use crate::services::upload_store::UPLOADS_URL_PREFIX;
use crate::services::IngestionPipeline;

/// HTTP-layer settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Browser origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Upper bound on an upload request body
    pub max_upload_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![config::DEFAULT_ALLOWED_ORIGIN.to_string()],
            max_upload_bytes: config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub http: HttpSettings,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, pipeline: Arc<IngestionPipeline>, http: HttpSettings) -> Self {
        Self {
            store,
            pipeline,
            http,
            startup_time: Utc::now(),
        }
    }

    fn uploads_dir(&self) -> PathBuf {
        self.pipeline.uploads().dir().to_path_buf()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads_dir());
    let cors = cors_layer(&state.http.allowed_origins);

    Router::new()
        .nest("/api/data", api::data_routes(state.http.max_upload_bytes))
        .merge(api::status_routes())
        .nest_service(&format!("/{}", UPLOADS_URL_PREFIX), uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the dashboard origins
///
/// Unparseable entries are skipped, and so is `*`: a wildcard cannot be
/// combined with credentials.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            let trimmed = origin.trim().trim_end_matches('/');
            if trimmed == "*" {
                tracing::warn!("Ignoring wildcard CORS origin; list dashboard origins explicitly");
                return None;
            }
            match HeaderValue::from_str(trimmed) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
