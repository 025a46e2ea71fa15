//! Record store
//!
//! Append-only persistence for pest detections and sensor readings. The
//! service talks to the store through the [`RecordStore`] trait so handlers
//! and the ingestion pipeline can be exercised against any implementation;
//! [`SqliteRecordStore`] is the production one.

pub mod pests;
pub mod sensors;

use anyhow::Result;
use async_trait::async_trait;
use expel_common::models::{NewPestDetection, NewSensorData, PestDetection, RecordKind, SensorData};
use expel_common::time;
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use uuid::Uuid;

/// Persistence contract for both record kinds
///
/// Inserts validate the document, assign an identifier and timestamps, and
/// return the stored record. Listings are ordered by ascending `createdAt`,
/// ties in insertion order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_pest(&self, record: NewPestDetection) -> expel_common::Result<PestDetection>;

    async fn insert_sensor(&self, record: NewSensorData) -> expel_common::Result<SensorData>;

    async fn list_pests(&self) -> expel_common::Result<Vec<PestDetection>>;

    async fn list_sensors(&self) -> expel_common::Result<Vec<SensorData>>;

    /// Delete every record of `kind`, returning the number removed
    async fn reset(&self, kind: RecordKind) -> expel_common::Result<u64>;

    /// Atomically replace both collections with the given documents
    ///
    /// Every document is validated before anything is deleted. Concurrent
    /// calls do not interleave: afterwards the store holds exactly one batch.
    async fn replace_all(
        &self,
        pests: Vec<NewPestDetection>,
        sensors: Vec<NewSensorData>,
    ) -> expel_common::Result<(usize, usize)>;
}

/// SQLite-backed record store
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert_pest(&self, record: NewPestDetection) -> expel_common::Result<PestDetection> {
        let record = record.into_record(Uuid::new_v4(), time::now())?;
        let mut conn = self.pool.acquire().await?;
        pests::insert(&mut *conn, &record).await?;
        tracing::debug!(id = %record.id, pest_type = %record.pest_type, "Pest detection stored");
        Ok(record)
    }

    async fn insert_sensor(&self, record: NewSensorData) -> expel_common::Result<SensorData> {
        let record = record.into_record(Uuid::new_v4(), time::now())?;
        let mut conn = self.pool.acquire().await?;
        sensors::insert(&mut *conn, &record).await?;
        Ok(record)
    }

    async fn list_pests(&self) -> expel_common::Result<Vec<PestDetection>> {
        pests::list_all(&self.pool).await
    }

    async fn list_sensors(&self) -> expel_common::Result<Vec<SensorData>> {
        sensors::list_all(&self.pool).await
    }

    async fn reset(&self, kind: RecordKind) -> expel_common::Result<u64> {
        let mut conn = self.pool.acquire().await?;
        let removed = delete_all(&mut *conn, kind).await?;

        tracing::info!(table = kind.table_name(), removed, "Collection reset");
        Ok(removed)
    }

    async fn replace_all(
        &self,
        pests: Vec<NewPestDetection>,
        sensors: Vec<NewSensorData>,
    ) -> expel_common::Result<(usize, usize)> {
        let now = time::now();
        let pest_records = pests
            .into_iter()
            .map(|doc| doc.into_record(Uuid::new_v4(), now))
            .collect::<expel_common::Result<Vec<_>>>()?;
        let sensor_records = sensors
            .into_iter()
            .map(|doc| doc.into_record(Uuid::new_v4(), now))
            .collect::<expel_common::Result<Vec<_>>>()?;

        // The first statement is a write, so a second concurrent replacement
        // waits on the write lock until this one commits
        let mut tx = self.pool.begin().await?;
        let removed_pests = delete_all(&mut *tx, RecordKind::PestDetections).await?;
        let removed_sensors = delete_all(&mut *tx, RecordKind::SensorReadings).await?;

        for record in &pest_records {
            pests::insert(&mut *tx, record).await?;
        }
        for record in &sensor_records {
            sensors::insert(&mut *tx, record).await?;
        }
        tx.commit().await?;

        tracing::info!(
            removed_pests,
            removed_sensors,
            pests = pest_records.len(),
            sensors = sensor_records.len(),
            "Collections replaced"
        );
        Ok((pest_records.len(), sensor_records.len()))
    }
}

async fn delete_all(conn: &mut SqliteConnection, kind: RecordKind) -> expel_common::Result<u64> {
    // Table name comes from a closed enum, never from input
    let sql = format!("DELETE FROM {}", kind.table_name());
    let result = sqlx::query(&sql).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Initialize database connection pool
///
/// Opens (or creates) the database file and ensures the record tables exist.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create record tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pest_detections (
            id TEXT PRIMARY KEY,
            pest_type TEXT NOT NULL CHECK (length(pest_type) > 0),
            count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
            confidence REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
            severity TEXT NOT NULL DEFAULT 'Low' CHECK (severity IN ('Low', 'Medium', 'High')),
            recommendation TEXT NOT NULL,
            reasoning TEXT NOT NULL,
            image_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pest_detections_created_at ON pest_detections (created_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id TEXT PRIMARY KEY,
            temperature REAL NOT NULL,
            humidity REAL NOT NULL,
            soil_moisture REAL NOT NULL,
            risk_level TEXT NOT NULL CHECK (risk_level IN ('Low', 'Medium', 'High')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sensor_readings_created_at ON sensor_readings (created_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (pest_detections, sensor_readings)");

    Ok(())
}

/// Parse a stored UUID column
pub(crate) fn parse_id(value: &str) -> expel_common::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| expel_common::Error::Internal(format!("Invalid record id '{}': {}", value, e)))
}
