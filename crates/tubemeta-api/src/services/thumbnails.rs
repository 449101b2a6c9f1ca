//! Thumbnail rendering and headshot storage.
//!
//! Rendering is: generate artwork, optionally composite the presenter's
//! headshot, then upload the PNG to the CDN. If anything after generation
//! fails and the provider gave us a URL, that temporary URL is returned
//! instead so the user still gets their image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{info, warn};

use tubemeta_ai::{GeneratedImage, ImagePayload};
use tubemeta_media::{composite_headshot, normalize_thumbnail, HeadshotOverlay, MediaResult};
use tubemeta_models::validation::MAX_IMAGE_BYTES;
use tubemeta_models::ThumbnailSpec;
use tubemeta_storage::object_key;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::prompts::build_thumbnail_prompt;
use crate::services::upstream::timed;
use crate::state::AppState;

/// Largest generated image we are willing to download.
const MAX_GENERATED_IMAGE_BYTES: usize = 20 * 1024 * 1024;

const THUMBNAIL_PREFIX: &str = "thumbnails";
const HEADSHOT_PREFIX: &str = "headshots";

/// A finished thumbnail.
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub url: String,
    pub prompt_used: String,
}

/// Generate, composite and publish a thumbnail.
///
/// `spec.headshot_url` must already have passed URL validation.
pub async fn render_thumbnail(state: &AppState, spec: &ThumbnailSpec) -> ApiResult<RenderedThumbnail> {
    let prompt = build_thumbnail_prompt(spec);
    let image = timed("image", state.images.generate(&prompt)).await?;
    let prompt_used = image.revised_prompt.clone().unwrap_or(prompt);

    // Nothing to do locally: hand back the provider URL as-is
    if state.cdn.is_none() && spec.headshot_url.is_none() {
        if let Some(url) = image.temporary_url() {
            return Ok(RenderedThumbnail {
                url: url.to_string(),
                prompt_used,
            });
        }
    }

    match finish(state, &image, spec.headshot_url.as_deref()).await {
        Ok(url) => Ok(RenderedThumbnail { url, prompt_used }),
        Err(e) => match image.temporary_url() {
            Some(url) => {
                warn!(error = %e, "Thumbnail post-processing failed, serving temporary URL");
                metrics::record_cdn_fallback();
                Ok(RenderedThumbnail {
                    url: url.to_string(),
                    prompt_used,
                })
            }
            None => Err(e),
        },
    }
}

async fn finish(state: &AppState, image: &GeneratedImage, headshot_url: Option<&str>) -> ApiResult<String> {
    let base = match &image.payload {
        ImagePayload::Bytes(bytes) => bytes.clone(),
        ImagePayload::Url(url) => state.images.download(url, MAX_GENERATED_IMAGE_BYTES).await?,
    };

    let png = match headshot_url {
        Some(url) => {
            let headshot = state.images.download(url, MAX_IMAGE_BYTES).await?;
            run_blocking(move || composite_headshot(&base, &headshot, &HeadshotOverlay::default()))
                .await?
        }
        None => run_blocking(move || normalize_thumbnail(&base)).await?,
    };

    match &state.cdn {
        Some(cdn) => {
            let key = object_key(THUMBNAIL_PREFIX, "image/png")?;
            let uploaded = cdn.store.put(&key, png, "image/png").await;
            metrics::record_upload("thumbnail", uploaded.is_ok());
            let url = uploaded?;
            info!(key = %key, "Thumbnail published");
            Ok(url)
        }
        // No CDN: the page can still show and download an inline image
        None => Ok(format!("data:image/png;base64,{}", STANDARD.encode(png))),
    }
}

/// Upload a validated headshot image and return its public URL.
pub async fn store_headshot(state: &AppState, bytes: Vec<u8>, content_type: &str) -> ApiResult<String> {
    let cdn = state
        .cdn
        .as_ref()
        .ok_or_else(|| ApiError::not_configured("R2 storage is not configured"))?;

    let key = object_key(HEADSHOT_PREFIX, content_type)?;
    let uploaded = cdn.store.put(&key, bytes, content_type).await;
    metrics::record_upload("headshot", uploaded.is_ok());
    Ok(uploaded?)
}

async fn run_blocking<F>(work: F) -> ApiResult<Vec<u8>>
where
    F: FnOnce() -> MediaResult<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("image task failed: {}", e)))?
        .map_err(ApiError::from)
}
