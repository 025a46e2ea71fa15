//! Detection ingestion pipeline
//!
//! One upload runs one sequential pass:
//!
//! ```text
//! Received -> Inferred -> Normalized -> Persisted
//!     \__________\___________\____________\__> Failed
//! ```
//!
//! Every failure is terminal for the request: no retries and no partial
//! record. The store write is the last step, so a failed pass never leaves a
//! record behind. The stored image is kept on failure unless
//! `cleanup_failed_uploads` is enabled.

use axum::body::Bytes;
use expel_common::models::{NewPestDetection, PestDetection};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::db::RecordStore;
use crate::services::inference_gateway::{GatewayError, InferenceGateway};
use crate::services::normalizer::{self, DetectionCandidate, StructuredResponseParseError};
use crate::services::upload_store::{StoredUpload, UploadStore};

/// Fallback when neither the client nor content sniffing names a type
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Inferred,
    Normalized,
    Persisted,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Received => "received",
            PipelineState::Inferred => "inferred",
            PipelineState::Normalized => "normalized",
            PipelineState::Persisted => "persisted",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Image as received from the client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: String,
    /// Declared content type of the multipart part, if any
    pub declared_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Declared type, or a sniffed one when the client sent none or a generic one
    pub fn media_type(&self) -> String {
        match self.declared_type.as_deref() {
            Some(declared) if !declared.is_empty() && declared != UNKNOWN_MEDIA_TYPE => declared.to_string(),
            _ => infer::get(&self.bytes)
                .map(|kind| kind.mime_type().to_string())
                .unwrap_or_else(|| UNKNOWN_MEDIA_TYPE.to_string()),
        }
    }
}

/// Terminal pipeline failure
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("failed to store upload: {0}")]
    Upload(#[source] std::io::Error),

    #[error("inference gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error("inference call timed out after {0:?}")]
    GatewayTimeout(Duration),

    #[error(transparent)]
    Parse(#[from] StructuredResponseParseError),

    #[error("record store rejected detection: {0}")]
    Store(#[from] expel_common::Error),
}

impl IngestionError {
    /// The state the pipeline was trying to reach when it failed
    pub fn failed_transition(&self) -> PipelineState {
        match self {
            IngestionError::Upload(_) => PipelineState::Received,
            IngestionError::Gateway(_) | IngestionError::GatewayTimeout(_) => PipelineState::Inferred,
            IngestionError::Parse(_) => PipelineState::Normalized,
            IngestionError::Store(_) => PipelineState::Persisted,
        }
    }
}

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on the inference call
    pub inference_timeout: Duration,
    /// Delete the stored image when the pass fails
    pub cleanup_failed_uploads: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            inference_timeout: Duration::from_secs(60),
            cleanup_failed_uploads: false,
        }
    }
}

/// Upload -> inference -> normalization -> persistence
pub struct IngestionPipeline {
    gateway: Arc<dyn InferenceGateway>,
    store: Arc<dyn RecordStore>,
    uploads: UploadStore,
    options: PipelineOptions,
}

impl IngestionPipeline {
    pub fn new(
        gateway: Arc<dyn InferenceGateway>,
        store: Arc<dyn RecordStore>,
        uploads: UploadStore,
        options: PipelineOptions,
    ) -> Self {
        Self {
            gateway,
            store,
            uploads,
            options,
        }
    }

    pub fn model_name(&self) -> &str {
        self.gateway.model_name()
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Run one upload through every stage, returning the persisted record
    pub async fn ingest(&self, upload: ImageUpload) -> Result<PestDetection, IngestionError> {
        let stored = self
            .uploads
            .save(&upload.original_name, &upload.bytes)
            .await
            .map_err(IngestionError::Upload)?;
        tracing::info!(state = %PipelineState::Received, image = %stored.url, "Detection pipeline");

        match self.process(&upload, &stored).await {
            Ok(record) => {
                tracing::info!(
                    state = %PipelineState::Persisted,
                    id = %record.id,
                    pest_type = %record.pest_type,
                    severity = %record.severity,
                    "Detection pipeline"
                );
                Ok(record)
            }
            Err(err) => {
                tracing::warn!(
                    state = %PipelineState::Failed,
                    failed_at = %err.failed_transition(),
                    error = %err,
                    "Detection pipeline"
                );
                if self.options.cleanup_failed_uploads {
                    if let Err(e) = self.uploads.discard(&stored).await {
                        tracing::warn!(path = %stored.path.display(), "Failed to remove upload: {}", e);
                    }
                }
                Err(err)
            }
        }
    }

    async fn process(&self, upload: &ImageUpload, stored: &StoredUpload) -> Result<PestDetection, IngestionError> {
        let media_type = upload.media_type();

        let reply = tokio::time::timeout(
            self.options.inference_timeout,
            self.gateway.analyze(&upload.bytes, &media_type),
        )
        .await
        .map_err(|_| IngestionError::GatewayTimeout(self.options.inference_timeout))??;
        tracing::debug!(state = %PipelineState::Inferred, reply_chars = reply.len(), "Detection pipeline");

        let candidate = normalizer::normalize(&reply)?;
        tracing::debug!(state = %PipelineState::Normalized, pest_type = %candidate.pest_type, "Detection pipeline");

        let record = self
            .store
            .insert_pest(into_document(candidate, stored.url.clone()))
            .await?;

        Ok(record)
    }
}

/// Canonical insert document for a normalized candidate
fn into_document(candidate: DetectionCandidate, image_url: String) -> NewPestDetection {
    NewPestDetection {
        pest_type: Some(candidate.pest_type),
        count: Some(candidate.count),
        confidence: candidate.confidence,
        severity: Some(candidate.severity),
        recommendation: Some(candidate.recommendation),
        reasoning: Some(candidate.reasoning),
        image_url: Some(image_url),
        created_at: None,
    }
}
