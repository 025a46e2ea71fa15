//! Demo data seeder
//!
//! Destructive reset used by the dashboard demo: clears both collections and
//! fills them with randomly parameterized synthetic records spread back in
//! time, so the trend charts have a history to draw.

use chrono::{DateTime, Duration, Utc};
use expel_common::models::{NewPestDetection, NewSensorData};
use expel_common::Result;
use rand::Rng;

use crate::db::RecordStore;

pub const SEED_PEST_COUNT: usize = 15;
pub const SEED_SENSOR_COUNT: usize = 20;

/// Share of seeded detections marked High severity
const HIGH_SEVERITY_PROBABILITY: f64 = 0.3;

/// Pest types with the visual evidence and organic action shown for each
const PEST_PROFILES: [(&str, &str, &str); 4] = [
    (
        "Aphids",
        "Clusters of small green/black insects found on new growth.",
        "Apply organic neem oil spray and increase airflow.",
    ),
    (
        "Whiteflies",
        "Cloud of tiny white insects emerged when leaf was shaken.",
        "Install yellow sticky traps and introduce Encarsia formosa.",
    ),
    (
        "Thrips",
        "Silvery scars and black specks (frass) visible on leaves.",
        "Use blue sticky traps and maintain high humidity.",
    ),
    (
        "Scale Insects",
        "Waxy, stationary brown bumps found along the leaf veins.",
        "Prune heavily infested stems and scrub remaining with soapy water.",
    ),
];

/// Outcome of a seeding run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub pests: usize,
    pub sensors: usize,
}

/// Pest detections dated one per day going back from `now`
pub fn generate_pests<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<NewPestDetection> {
    (0..SEED_PEST_COUNT)
        .map(|i| {
            let (pest_type, reasoning, recommendation) = PEST_PROFILES[rng.gen_range(0..PEST_PROFILES.len())];
            let severity = if rng.gen_bool(HIGH_SEVERITY_PROBABILITY) { "High" } else { "Low" };

            NewPestDetection {
                pest_type: Some(pest_type.to_string()),
                count: Some(rng.gen_range(5..80)),
                confidence: 0.95,
                severity: Some(severity.to_string()),
                recommendation: Some(recommendation.to_string()),
                reasoning: Some(reasoning.to_string()),
                image_url: None,
                created_at: Some(now - Duration::days(i as i64)),
            }
        })
        .collect()
}

/// Sensor readings dated one per hour going back from `now`
pub fn generate_sensors<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<NewSensorData> {
    (0..SEED_SENSOR_COUNT)
        .map(|i| NewSensorData {
            temperature: Some(rng.gen_range(20.0..30.0)),
            humidity: Some(rng.gen_range(45.0..80.0)),
            soil_moisture: Some(rng.gen_range(30.0..60.0)),
            risk_level: Some("Low".to_string()),
            created_at: Some(now - Duration::hours(i as i64)),
        })
        .collect()
}

/// Replace both collections with a fresh synthetic batch
///
/// The batch is generated up front and swapped in by one store transaction,
/// so concurrent reseeds still leave exactly one batch behind.
pub async fn reseed<R: Rng>(store: &dyn RecordStore, rng: &mut R) -> Result<SeedSummary> {
    let now = expel_common::time::now();
    let pests = generate_pests(rng, now);
    let sensors = generate_sensors(rng, now);

    let (pests, sensors) = store.replace_all(pests, sensors).await?;
    let summary = SeedSummary { pests, sensors };

    tracing::info!(pests = summary.pests, sensors = summary.sensors, "Database seeded with demo data");
    Ok(summary)
}
