//! Shared fixtures for expel-api integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use expel_api::db::{self, RecordStore, SqliteRecordStore};
use expel_api::services::{GatewayError, InferenceGateway, IngestionPipeline, PipelineOptions, UploadStore};
use expel_api::{build_router, AppState, HttpSettings};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BOUNDARY: &str = "expel-test-boundary";

/// Minimal JPEG header, enough for content sniffing
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01];

pub const HEALTHY_LEAF_REPLY: &str = r#"```json
{"pestType":"None","count":0,"confidence":0.97,"severity":"Low","reasoning":"No lesions or insects visible.","recommendation":"Continue weekly scouting."}
```"#;

pub const APHID_REPLY: &str = r#"Here is my analysis:
{"pestType":"Aphids","count":"12","confidence":0.88,"severity":"Medium","reasoning":"Found 12 aphids on the underside","recommendation":"Release ladybugs."}
Let me know if you need more."#;

// =============================================================================
// Fake gateways
// =============================================================================

/// Returns the same reply for every image and counts calls
pub struct CannedGateway {
    reply: String,
    calls: AtomicUsize,
}

impl CannedGateway {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceGateway for CannedGateway {
    fn model_name(&self) -> &str {
        "canned-model"
    }

    async fn analyze(&self, _image: &[u8], _media_type: &str) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Fails every call as if the network dropped
pub struct UnreachableGateway;

#[async_trait]
impl InferenceGateway for UnreachableGateway {
    fn model_name(&self) -> &str {
        "unreachable-model"
    }

    async fn analyze(&self, _image: &[u8], _media_type: &str) -> Result<String, GatewayError> {
        Err(GatewayError::Network("connection reset by peer".to_string()))
    }
}

/// Never answers
pub struct StalledGateway;

#[async_trait]
impl InferenceGateway for StalledGateway {
    fn model_name(&self) -> &str {
        "stalled-model"
    }

    async fn analyze(&self, _image: &[u8], _media_type: &str) -> Result<String, GatewayError> {
        std::future::pending::<()>().await;
        Ok(String::new())
    }
}

// =============================================================================
// Application fixtures
// =============================================================================

/// In-memory store; a single connection keeps every query on the same database
pub async fn memory_store() -> Arc<SqliteRecordStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    db::init_tables(&pool).await.expect("Should create tables");
    Arc::new(SqliteRecordStore::new(pool))
}

/// Router plus the handles tests inspect afterwards
pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteRecordStore>,
    pub uploads: TempDir,
}

impl TestApp {
    pub async fn with_gateway(gateway: Arc<dyn InferenceGateway>) -> Self {
        Self::build(gateway, PipelineOptions::default(), HttpSettings::default()).await
    }

    pub async fn build(gateway: Arc<dyn InferenceGateway>, options: PipelineOptions, http: HttpSettings) -> Self {
        let store = memory_store().await;
        let uploads = TempDir::new().expect("Should create uploads dir");

        let pipeline = IngestionPipeline::new(
            gateway,
            store.clone(),
            UploadStore::new(uploads.path().to_path_buf()),
            options,
        );
        let state = AppState::new(store.clone(), Arc::new(pipeline), http);

        Self {
            router: build_router(state),
            store,
            uploads,
        }
    }

    /// Number of files currently in the uploads directory
    pub fn stored_upload_count(&self) -> usize {
        std::fs::read_dir(self.uploads.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn pest_count(&self) -> usize {
        self.store.list_pests().await.expect("Should list pests").len()
    }
}

pub fn quick_timeout_options() -> PipelineOptions {
    PipelineOptions {
        inference_timeout: Duration::from_millis(50),
        cleanup_failed_uploads: false,
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One multipart part
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn image(file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "image",
            file_name: Some(file_name),
            content_type: Some("image/jpeg"),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn detect_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/data/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
