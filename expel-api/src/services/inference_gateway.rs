//! Inference gateway
//!
//! Sends a leaf image and the fixed grading rubric to an external multimodal
//! model and returns the model's raw reply text. The reply is opaque here;
//! it often wraps the requested JSON in prose or code fences, which is the
//! normalizer's problem.
//!
//! A single best-effort call: no retries.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const USER_AGENT: &str = concat!("ExpelAI/", env!("CARGO_PKG_VERSION"));

/// Media types the model accepts for inline image input
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/heic", "image/heif"];

/// Grading rubric sent with every image
pub const RUBRIC_PROMPT: &str = r#"Analyze this polyhouse leaf image as an expert Agricultural AI Pathologist.

CRITICAL GRADING SCALE FOR SEVERITY:
- LOW: Leaf is mostly healthy. Fewer than 5 pests visible OR very minor spotting (<5% of leaf area).
- MEDIUM: 5-15 pests visible OR clear signs of curling, yellowing, or holes (5-20% of leaf area).
- HIGH: Over 15 pests visible OR severe structural damage, necrosis, or dense webbing (>20% of leaf area).

If the leaf is perfectly healthy, set pestType to "None", count to 0, and severity to "Low".

Return ONLY a raw JSON object with this EXACT structure:
{
    "pestType": "Common name of the pest",
    "count": number,
    "confidence": number (between 0 and 1),
    "severity": "Low" | "Medium" | "High",
    "reasoning": "Explain the specific visual evidence (e.g., 'Found 8 aphids on the underside', 'Yellow halo spots seen').",
    "recommendation": "Provide one specific, chemical-free organic farming action."
}
"#;

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Image buffer is empty")]
    EmptyImage,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Model API key is not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model returned no text{}", .0.as_ref().map(|r| format!(" (blocked: {})", r)).unwrap_or_default())]
    EmptyResponse(Option<String>),
}

/// External reasoning model that grades a leaf image
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Model identifier, reported by the status endpoint
    fn model_name(&self) -> &str;

    /// Run the rubric prompt against `image` and return the raw reply text
    async fn analyze(&self, image: &[u8], media_type: &str) -> Result<String, GatewayError>;
}

/// Reject inputs the model cannot accept before spending a network call
pub fn validate_image_input(image: &[u8], media_type: &str) -> Result<(), GatewayError> {
    if image.is_empty() {
        return Err(GatewayError::EmptyImage);
    }

    if !SUPPORTED_IMAGE_TYPES.contains(&media_type) {
        return Err(GatewayError::UnsupportedMediaType(media_type.to_string()));
    }

    Ok(())
}

// Gemini generateContent wire types

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn into_text(self) -> Result<String, GatewayError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
            return Err(GatewayError::EmptyResponse(block_reason));
        }

        Ok(text)
    }
}

/// Gemini REST client
pub struct GeminiGateway {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiGateway {
    /// Build a client; `timeout` bounds every request end to end
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: base_url
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl InferenceGateway for GeminiGateway {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, image: &[u8], media_type: &str) -> Result<String, GatewayError> {
        validate_image_input(image, media_type)?;
        let api_key = self.api_key.as_deref().ok_or(GatewayError::MissingApiKey)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text { text: RUBRIC_PROMPT },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: media_type,
                            data: general_purpose::STANDARD.encode(image),
                        },
                    },
                ],
            }],
        };

        tracing::debug!(model = %self.model, media_type, bytes = image.len(), "Querying model API");

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GatewayError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api(status.as_u16(), error_text));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        let text = body.into_text()?;
        tracing::info!(model = %self.model, reply_chars = text.len(), "Model analysis received");

        Ok(text)
    }
}
