//! Liveness endpoint

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

/// GET /api/status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    /// Model used for detections
    pub system: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let now = Utc::now();
    let uptime_seconds = now.signed_duration_since(state.startup_time).num_seconds().max(0) as u64;

    Json(StatusResponse {
        status: "ok".to_string(),
        message: "ExpelAI API is running".to_string(),
        system: state.pipeline.model_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        timestamp: now,
    })
}
