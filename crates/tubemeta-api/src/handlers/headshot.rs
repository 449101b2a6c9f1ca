//! Headshot uploads.

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use tubemeta_media::sniff_image_type;
use tubemeta_models::validation::MAX_IMAGE_BYTES;
use tubemeta_models::{is_allowed_headshot_type, HeadshotUploadResponse};

use crate::error::{ApiError, ApiResult};
use crate::services::store_headshot;
use crate::state::AppState;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

/// Request body cap for uploads: the image plus multipart framing.
pub const HEADSHOT_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// `POST /api/headshot`
pub async fn upload_headshot(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<HeadshotUploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let declared = field.content_type().unwrap_or_default().to_string();
        if !is_allowed_headshot_type(&declared) {
            return Err(ApiError::bad_request("Headshot must be a PNG, JPEG or WebP image"));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        check_size(bytes.len())?;

        // Trust the bytes, not the declared type
        let content_type = sniff_image_type(&bytes)
            .filter(|sniffed| is_allowed_headshot_type(sniffed))
            .ok_or_else(|| ApiError::bad_request("Headshot is not a valid PNG, JPEG or WebP image"))?;

        let size = bytes.len();
        let url = store_headshot(&state, bytes.to_vec(), content_type).await?;
        info!(content_type, size, "Stored headshot");

        return Ok(Json(HeadshotUploadResponse { success: true, url }));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

fn check_size(len: usize) -> ApiResult<()> {
    if len == 0 {
        return Err(ApiError::bad_request("Headshot file is empty"));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(ApiError::bad_request(format!(
            "Headshot must be at most {} MB",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}
