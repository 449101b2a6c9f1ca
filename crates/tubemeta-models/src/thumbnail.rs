//! Thumbnail generation and headshot upload types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validation::{
    optional_text, require_text, ValidationError, ValidationResult, MAX_CHANNEL_CHARS,
    MAX_CONCEPT_CHARS, MAX_EMOTION_CHARS, MAX_STYLE_GUIDE_CHARS, MAX_TEXT_OVERLAY_CHARS,
    MAX_URL_CHARS, MAX_VIDEO_TITLE_CHARS,
};

/// Content types accepted for headshot uploads.
pub const ALLOWED_HEADSHOT_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Check a multipart content type against the headshot allow-list.
pub fn is_allowed_headshot_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_HEADSHOT_TYPES.contains(&essence.as_str())
}

/// Request body for thumbnail generation.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailRequest {
    pub concept: String,
    /// Text rendered on the thumbnail; may be empty for text-free designs
    pub text_overlay: String,
    pub emotion: String,
    pub channel: String,
    #[serde(default)]
    pub style_guide: Option<String>,
    #[serde(default)]
    pub headshot_url: Option<String>,
    #[serde(default)]
    pub video_title: Option<String>,
}

/// A validated thumbnail request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailSpec {
    pub concept: String,
    pub text_overlay: String,
    pub emotion: String,
    pub channel: String,
    pub style_guide: Option<String>,
    pub headshot_url: Option<String>,
    pub video_title: Option<String>,
}

impl ThumbnailRequest {
    /// Validate field presence and lengths. URL safety is checked by the server.
    pub fn validate(&self) -> ValidationResult<ThumbnailSpec> {
        let text_overlay = self.text_overlay.trim();
        if text_overlay.chars().count() > MAX_TEXT_OVERLAY_CHARS {
            return Err(ValidationError::TooLong {
                field: "Text overlay",
                max: MAX_TEXT_OVERLAY_CHARS,
            });
        }

        let headshot_url = optional_text("Headshot URL", self.headshot_url.as_deref(), MAX_URL_CHARS)?;
        if let Some(url) = &headshot_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::invalid("Headshot URL must be an http(s) URL"));
            }
        }

        Ok(ThumbnailSpec {
            concept: require_text("Concept", &self.concept, MAX_CONCEPT_CHARS)?,
            text_overlay: text_overlay.to_string(),
            emotion: require_text("Emotion", &self.emotion, MAX_EMOTION_CHARS)?,
            channel: require_text("Channel", &self.channel, MAX_CHANNEL_CHARS)?,
            style_guide: optional_text("Style guide", self.style_guide.as_deref(), MAX_STYLE_GUIDE_CHARS)?,
            headshot_url,
            video_title: optional_text("Video title", self.video_title.as_deref(), MAX_VIDEO_TITLE_CHARS)?,
        })
    }
}

/// Response body for thumbnail generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailResponse {
    pub success: bool,
    /// CDN URL, or the temporary upstream URL when the CDN upload failed
    pub url: String,
    pub prompt_used: String,
    pub text_overlay: String,
}

/// Response body for headshot uploads.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeadshotUploadResponse {
    pub success: bool,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ThumbnailRequest {
        ThumbnailRequest {
            concept: "Presenter pointing at a glowing chart".to_string(),
            text_overlay: "IT WORKS".to_string(),
            emotion: "excited".to_string(),
            channel: "Tech Talks".to_string(),
            style_guide: Some("  ".to_string()),
            headshot_url: None,
            video_title: None,
        }
    }

    #[test]
    fn test_validate_ok() {
        let spec = request().validate().unwrap();
        assert_eq!(spec.text_overlay, "IT WORKS");
        assert_eq!(spec.style_guide, None);
    }

    #[test]
    fn test_text_overlay_limit() {
        let mut req = request();
        req.text_overlay = "X".repeat(MAX_TEXT_OVERLAY_CHARS + 1);
        assert!(matches!(req.validate(), Err(ValidationError::TooLong { field: "Text overlay", .. })));
    }

    #[test]
    fn test_headshot_url_scheme() {
        let mut req = request();
        req.headshot_url = Some("file:///etc/passwd".to_string());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_headshot_content_types() {
        assert!(is_allowed_headshot_type("image/png"));
        assert!(is_allowed_headshot_type("IMAGE/JPEG; charset=binary"));
        assert!(!is_allowed_headshot_type("image/svg+xml"));
        assert!(!is_allowed_headshot_type("text/plain"));
    }
}
