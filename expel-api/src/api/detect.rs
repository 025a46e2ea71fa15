//! Image upload and detection endpoint

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use expel_common::models::PestDetection;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::services::ImageUpload;
use crate::AppState;

/// Multipart part carrying the leaf image
pub const IMAGE_FIELD: &str = "image";

/// POST /api/data/detect response
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub message: String,
    pub data: PestDetection,
}

/// POST /api/data/detect
///
/// Accepts one image file in the `image` part, runs it through the
/// ingestion pipeline and returns the stored detection. A request without
/// an image file (including a non-multipart body) is a 400.
pub async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DetectResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Upload rejected: {}", rejection.body_text());
        ApiError::NoImageProvided
    })?;

    let upload = read_image_part(&mut multipart)
        .await?
        .ok_or(ApiError::NoImageProvided)?;

    tracing::info!(
        file = %upload.original_name,
        declared_type = ?upload.declared_type,
        bytes = upload.bytes.len(),
        "Detection requested"
    );

    let record = state.pipeline.ingest(upload).await?;

    Ok(Json(DetectResponse {
        message: "Success".to_string(),
        data: record,
    }))
}

/// First file part named `image`; plain form fields with that name don't count
async fn read_image_part(multipart: &mut Multipart) -> ApiResult<Option<ImageUpload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::Multipart)?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let declared_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(ApiError::Multipart)?;

        return Ok(Some(ImageUpload {
            original_name,
            declared_type,
            bytes,
        }));
    }

    Ok(None)
}
