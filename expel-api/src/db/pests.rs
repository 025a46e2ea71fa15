//! Pest detection queries

use expel_common::models::PestDetection;
use expel_common::time::{from_storage, to_storage};
use expel_common::{Error, Result, RiskLevel};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::parse_id;

/// Insert an already-validated detection
pub async fn insert(conn: &mut SqliteConnection, record: &PestDetection) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pest_detections (
            id, pest_type, count, confidence, severity,
            recommendation, reasoning, image_url, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.pest_type)
    .bind(record.count)
    .bind(record.confidence)
    .bind(record.severity.as_str())
    .bind(&record.recommendation)
    .bind(&record.reasoning)
    .bind(&record.image_url)
    .bind(to_storage(&record.created_at))
    .bind(to_storage(&record.updated_at))
    .execute(conn)
    .await?;

    Ok(())
}

/// All detections, oldest first
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<PestDetection>> {
    let rows = sqlx::query(
        r#"
        SELECT id, pest_type, count, confidence, severity,
               recommendation, reasoning, image_url, created_at, updated_at
        FROM pest_detections
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

fn from_row(row: &SqliteRow) -> Result<PestDetection> {
    let severity: String = row.get("severity");
    let severity = severity
        .parse::<RiskLevel>()
        .map_err(|msg| Error::Internal(format!("Stored severity is invalid: {}", msg)))?;

    Ok(PestDetection {
        id: parse_id(row.get("id"))?,
        pest_type: row.get("pest_type"),
        count: row.get("count"),
        confidence: row.get("confidence"),
        severity,
        recommendation: row.get("recommendation"),
        reasoning: row.get("reasoning"),
        image_url: row.get("image_url"),
        created_at: from_storage(row.get("created_at"))?,
        updated_at: from_storage(row.get("updated_at"))?,
    })
}
