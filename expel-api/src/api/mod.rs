//! HTTP API handlers for expel-api

pub mod detect;
pub mod records;
pub mod status;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use detect::detect;
pub use records::{list_pests, list_sensors, seed};
pub use status::status;

/// Routes under `/api/data`
pub fn data_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/detect",
            post(detect).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/pests", get(list_pests))
        .route("/sensors", get(list_sensors))
        .route("/seed", get(seed))
}

/// `GET /api/status`
pub fn status_routes() -> Router<AppState> {
    Router::new().route("/api/status", get(status))
}
