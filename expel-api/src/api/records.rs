//! Record listing and demo seeding endpoints

use axum::{extract::State, http::StatusCode, Json};
use expel_common::models::{PestDetection, SensorData};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::error::ApiResult;
use crate::services::seeder;
use crate::AppState;

/// GET /api/data/pests
///
/// Every detection, oldest first. No pagination or filtering.
pub async fn list_pests(State(state): State<AppState>) -> ApiResult<Json<Vec<PestDetection>>> {
    Ok(Json(state.store.list_pests().await?))
}

/// GET /api/data/sensors
///
/// Every sensor reading, oldest first.
pub async fn list_sensors(State(state): State<AppState>) -> ApiResult<Json<Vec<SensorData>>> {
    Ok(Json(state.store.list_sensors().await?))
}

/// GET /api/data/seed response
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub pests: usize,
    pub sensors: usize,
}

/// GET /api/data/seed
///
/// Destructive: replaces both collections with synthetic demo data.
pub async fn seed(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<SeedResponse>)> {
    tracing::warn!("Resetting all records for demo seeding");

    let mut rng = StdRng::from_entropy();
    let summary = seeder::reseed(state.store.as_ref(), &mut rng).await?;

    Ok((
        StatusCode::CREATED,
        Json(SeedResponse {
            message: format!(
                "Database seeded with {} pest detections and {} sensor readings",
                summary.pests, summary.sensors
            ),
            pests: summary.pests,
            sensors: summary.sensors,
        }),
    ))
}
