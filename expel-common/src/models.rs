//! Record data model
//!
//! Two flat entity kinds are persisted: pest detections produced by the
//! ingestion pipeline (or the demo seeder) and environmental sensor readings.
//!
//! `New*` types are unvalidated insert documents. Their optional fields let
//! the store tell "absent" apart from "present but invalid", apply its schema
//! defaults, and report the offending field by its wire name. Calling
//! `into_record` is the only way to obtain a persisted record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Store default for `PestDetection::recommendation`
pub const DEFAULT_RECOMMENDATION: &str = "Continue monitoring.";

/// Store default for `PestDetection::reasoning`
pub const DEFAULT_REASONING: &str = "Visual analysis complete.";

/// Ordered three-level scale shared by detection severity and sensor risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-match parse; `"high"` is outside the enum
impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("'{}' is not one of Low, Medium, High", s))
    }
}

/// Collection selector for bulk operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    PestDetections,
    SensorReadings,
}

impl RecordKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            RecordKind::PestDetections => "pest_detections",
            RecordKind::SensorReadings => "sensor_readings",
        }
    }
}

/// Persisted pest detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PestDetection {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub pest_type: String,
    pub count: i64,
    pub confidence: f64,
    pub severity: RiskLevel,
    pub recommendation: String,
    pub reasoning: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert document for a pest detection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPestDetection {
    pub pest_type: Option<String>,
    pub count: Option<i64>,
    pub confidence: f64,
    /// Raw label; checked against [`RiskLevel`] during validation
    pub severity: Option<String>,
    pub recommendation: Option<String>,
    pub reasoning: Option<String>,
    pub image_url: Option<String>,
    /// Backdated creation time, used only by the demo seeder
    pub created_at: Option<DateTime<Utc>>,
}

impl NewPestDetection {
    /// Check field constraints without consuming the document
    pub fn validate(&self) -> Result<()> {
        match self.pest_type.as_deref() {
            None => return Err(Error::validation("pestType", "is required")),
            Some(s) if s.is_empty() => return Err(Error::validation("pestType", "must not be empty")),
            Some(_) => {}
        }

        if let Some(count) = self.count {
            if count < 0 {
                return Err(Error::validation("count", format!("must be non-negative, got {}", count)));
            }
        }

        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::validation(
                "confidence",
                format!("must be between 0 and 1, got {}", self.confidence),
            ));
        }

        if let Some(severity) = self.severity.as_deref() {
            severity
                .parse::<RiskLevel>()
                .map_err(|msg| Error::validation("severity", msg))?;
        }

        Ok(())
    }

    /// Validate, apply store defaults, and stamp identity and timestamps
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Result<PestDetection> {
        self.validate()?;

        let severity = match self.severity.as_deref() {
            Some(label) => label.parse::<RiskLevel>().map_err(|msg| Error::validation("severity", msg))?,
            None => RiskLevel::default(),
        };

        Ok(PestDetection {
            id,
            pest_type: self.pest_type.unwrap_or_default(),
            count: self.count.unwrap_or(0),
            confidence: self.confidence,
            severity,
            recommendation: self
                .recommendation
                .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
            reasoning: self.reasoning.unwrap_or_else(|| DEFAULT_REASONING.to_string()),
            image_url: self.image_url,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        })
    }
}

/// Persisted sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert document for a sensor reading
///
/// Every field is optional here so that a missing `riskLevel` surfaces as a
/// validation error from the store instead of a construction error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSensorData {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub risk_level: Option<String>,
    /// Backdated creation time, used only by the demo seeder
    pub created_at: Option<DateTime<Utc>>,
}

fn required_reading(field: &'static str, value: Option<f64>) -> Result<f64> {
    match value {
        None => Err(Error::validation(field, "is required")),
        Some(v) if !v.is_finite() => Err(Error::validation(field, format!("must be a finite number, got {}", v))),
        Some(v) => Ok(v),
    }
}

impl NewSensorData {
    /// Validate, then stamp identity and timestamps
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> Result<SensorData> {
        let temperature = required_reading("temperature", self.temperature)?;
        let humidity = required_reading("humidity", self.humidity)?;
        let soil_moisture = required_reading("soilMoisture", self.soil_moisture)?;

        let risk_level = self
            .risk_level
            .as_deref()
            .ok_or_else(|| Error::validation("riskLevel", "is required"))?
            .parse::<RiskLevel>()
            .map_err(|msg| Error::validation("riskLevel", msg))?;

        Ok(SensorData {
            id,
            temperature,
            humidity,
            soil_moisture,
            risk_level,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        })
    }
}
