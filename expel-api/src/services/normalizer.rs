//! Result normalizer
//!
//! Turns the model's free-form reply into a fully populated
//! [`DetectionCandidate`]. Only one failure is fatal: the reply contains no
//! JSON object and is not JSON as a whole. Every field is coerced on its own
//! with an explicit fallback, so one bad field never discards the rest.
//!
//! Range checks (confidence in [0,1], severity in the enum, count >= 0) are
//! left to the record store.

use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_PEST_TYPE: &str = "Unidentified";
pub const DEFAULT_SEVERITY: &str = "Low";
pub const DEFAULT_REASONING: &str = "Standard AI visual analysis completed.";
pub const DEFAULT_RECOMMENDATION: &str = "Maintain standard monitoring.";

/// The model reply held no usable JSON
#[derive(Debug, Error, PartialEq)]
#[error("failed to parse AI structured response")]
pub struct StructuredResponseParseError {
    /// Leading characters of the rejected reply, for server-side logs
    pub excerpt: String,
}

impl StructuredResponseParseError {
    fn from_text(text: &str) -> Self {
        Self {
            excerpt: text.chars().take(120).collect(),
        }
    }
}

/// Detection fields as read from the model, before store validation
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCandidate {
    pub pest_type: String,
    pub count: i64,
    pub confidence: f64,
    /// Raw label; the store decides whether it is a valid severity
    pub severity: String,
    pub reasoning: String,
    pub recommendation: String,
}

/// Parse and coerce a model reply
pub fn normalize(text: &str) -> Result<DetectionCandidate, StructuredResponseParseError> {
    let fields = extract_json_object(text)?;

    Ok(DetectionCandidate {
        pest_type: coerce_text(fields.get("pestType")).unwrap_or_else(|| DEFAULT_PEST_TYPE.to_string()),
        count: coerce_number(fields.get("count")).round() as i64,
        confidence: coerce_number(fields.get("confidence")),
        severity: coerce_text(fields.get("severity")).unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        reasoning: coerce_text(fields.get("reasoning")).unwrap_or_else(|| DEFAULT_REASONING.to_string()),
        recommendation: coerce_text(fields.get("recommendation"))
            .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
    })
}

/// Locate the first syntactically valid JSON object in `text`
///
/// Tries each `{` in order and parses one value from there, ignoring
/// whatever follows it, so unbalanced braces in surrounding prose cannot
/// pair with the object's own. When no object is found the whole text is
/// parsed; a reply that is valid JSON but not an object yields an empty
/// field map (every field defaulted).
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, StructuredResponseParseError> {
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(fields))) = values.next() {
            return Ok(fields);
        }
    }

    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "Model reply is JSON but not an object; using defaults");
            Ok(Map::new())
        }
        Err(_) => Err(StructuredResponseParseError::from_text(text)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loose numeric coercion; anything unusable becomes 0
///
/// Numbers pass through, numeric strings are parsed (blank is 0), `true` is
/// 1. Non-finite results also collapse to 0.
fn coerce_number(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };

    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// Truthiness-style text coercion
///
/// Non-empty strings pass through. Non-zero numbers, `true`, arrays and
/// objects are stringified. Empty strings, zero, `false`, null and absent
/// fields fall back to the caller's default.
fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Some(Value::Bool(true)) => Some("true".to_string()),
        Some(v @ (Value::Array(_) | Value::Object(_))) => Some(v.to_string()),
        _ => None,
    }
}
