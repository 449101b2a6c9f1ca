//! Channel style analysis from sample thumbnails.

use axum::extract::State;
use axum::Json;
use tracing::info;

use tubemeta_models::{SampleImage, StyleAnalysisRequest, StyleAnalysisResponse};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::ClientKey;
use crate::security::validate_image_url;
use crate::services::prompts::{build_style_prompt, STYLE_SYSTEM_PROMPT};
use crate::services::{enforce_api_limit, timed};
use crate::state::AppState;

/// `POST /api/style`
pub async fn analyze_style(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    ApiJson(req): ApiJson<StyleAnalysisRequest>,
) -> ApiResult<Json<StyleAnalysisResponse>> {
    let images = req.validate()?;

    // Remote samples are fetched by the provider, not by us, but they must
    // still point somewhere public.
    for image in &images {
        if let SampleImage::Remote(url) = image {
            validate_image_url(url, None)
                .into_result()
                .map_err(ApiError::bad_request)?;
        }
    }

    enforce_api_limit(&state, &client)?;

    let urls: Vec<&str> = images.iter().map(SampleImage::as_url).collect();
    let prompt = build_style_prompt(urls.len());
    let guide = timed(
        "vision",
        state.chat.complete_vision(STYLE_SYSTEM_PROMPT, &prompt, &urls),
    )
    .await?;

    let style_guide = guide.trim().to_string();
    if style_guide.is_empty() {
        return Err(ApiError::internal("vision model returned an empty style guide"));
    }

    info!(images = urls.len(), guide_chars = style_guide.len(), "Generated style guide");

    Ok(Json(StyleAnalysisResponse {
        success: true,
        style_guide,
    }))
}
