//! Sensor reading queries

use expel_common::models::SensorData;
use expel_common::time::{from_storage, to_storage};
use expel_common::{Error, Result, RiskLevel};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::parse_id;

pub async fn insert(conn: &mut SqliteConnection, record: &SensorData) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sensor_readings (
            id, temperature, humidity, soil_moisture, risk_level, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.temperature)
    .bind(record.humidity)
    .bind(record.soil_moisture)
    .bind(record.risk_level.as_str())
    .bind(to_storage(&record.created_at))
    .bind(to_storage(&record.updated_at))
    .execute(conn)
    .await?;

    Ok(())
}

/// All readings, oldest first
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<SensorData>> {
    let rows = sqlx::query(
        r#"
        SELECT id, temperature, humidity, soil_moisture, risk_level, created_at, updated_at
        FROM sensor_readings
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

fn from_row(row: &SqliteRow) -> Result<SensorData> {
    let risk_level: String = row.get("risk_level");
    let risk_level = risk_level
        .parse::<RiskLevel>()
        .map_err(|msg| Error::Internal(format!("Stored risk level is invalid: {}", msg)))?;

    Ok(SensorData {
        id: parse_id(row.get("id"))?,
        temperature: row.get("temperature"),
        humidity: row.get("humidity"),
        soil_moisture: row.get("soil_moisture"),
        risk_level,
        created_at: from_storage(row.get("created_at"))?,
        updated_at: from_storage(row.get("updated_at"))?,
    })
}
