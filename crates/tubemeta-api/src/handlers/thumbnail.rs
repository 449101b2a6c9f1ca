//! Thumbnail generation.

use axum::extract::State;
use axum::Json;
use tracing::info;

use tubemeta_models::{ThumbnailRequest, ThumbnailResponse};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::ClientKey;
use crate::security::validate_image_url;
use crate::services::{enforce_api_limit, render_thumbnail};
use crate::state::AppState;

/// `POST /api/thumbnail`
pub async fn generate_thumbnail(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    ApiJson(req): ApiJson<ThumbnailRequest>,
) -> ApiResult<Json<ThumbnailResponse>> {
    let spec = req.validate()?;

    // We download the headshot ourselves; with a CDN configured it must be
    // one we uploaded.
    if let Some(url) = &spec.headshot_url {
        let allowed_host = state.cdn.as_ref().map(|cdn| cdn.host.as_str());
        validate_image_url(url, allowed_host)
            .into_result()
            .map_err(ApiError::bad_request)?;
    }

    enforce_api_limit(&state, &client)?;

    let rendered = render_thumbnail(&state, &spec).await?;
    info!(
        channel = %spec.channel,
        headshot = spec.headshot_url.is_some(),
        inline = rendered.url.starts_with("data:"),
        "Generated thumbnail"
    );

    Ok(Json(ThumbnailResponse {
        success: true,
        url: rendered.url,
        prompt_used: rendered.prompt_used,
        text_overlay: spec.text_overlay,
    }))
}
