//! Detection services
//!
//! Inference gateway, result normalizer, upload storage, the ingestion
//! pipeline tying them together, and the demo seeder.

pub mod inference_gateway;
pub mod ingestion;
pub mod normalizer;
pub mod seeder;
pub mod upload_store;

pub use inference_gateway::{GatewayError, GeminiGateway, InferenceGateway};
pub use ingestion::{ImageUpload, IngestionError, IngestionPipeline, PipelineOptions, PipelineState};
pub use normalizer::{DetectionCandidate, StructuredResponseParseError};
pub use upload_store::{StoredUpload, UploadStore};
