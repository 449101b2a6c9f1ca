//! Style analysis request/response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validation::{
    ValidationError, ValidationResult, MAX_IMAGE_BYTES, MAX_STYLE_IMAGES, MAX_URL_CHARS,
    MIN_STYLE_IMAGES,
};

/// Inline image MIME types accepted in data URLs.
pub const ALLOWED_INLINE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Request body for style analysis.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StyleAnalysisRequest {
    /// Sample thumbnails as data URLs or http(s) URLs
    pub images: Vec<String>,
}

/// A sample image after shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleImage {
    /// `data:image/...;base64,...` kept verbatim
    Inline { mime: String, data_url: String },
    /// Remote URL, still subject to the server's SSRF checks
    Remote(String),
}

impl SampleImage {
    /// Parse a single image reference.
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| ValidationError::invalid("Malformed image data URL"))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| ValidationError::invalid("Image data URLs must be base64 encoded"))?
                .to_ascii_lowercase();
            if !ALLOWED_INLINE_TYPES.contains(&mime.as_str()) {
                return Err(ValidationError::invalid(format!(
                    "Unsupported image type '{}'. Use PNG, JPEG, WebP or GIF",
                    mime
                )));
            }
            if payload.is_empty() {
                return Err(ValidationError::invalid("Image data URL is empty"));
            }
            // Decoded size of base64 is three quarters of the encoded length
            if payload.len() / 4 * 3 > MAX_IMAGE_BYTES {
                return Err(ValidationError::invalid(format!(
                    "Each image must be at most {} MB",
                    MAX_IMAGE_BYTES / (1024 * 1024)
                )));
            }
            return Ok(Self::Inline {
                mime,
                data_url: raw.to_string(),
            });
        }

        if raw.starts_with("https://") || raw.starts_with("http://") {
            if raw.len() > MAX_URL_CHARS {
                return Err(ValidationError::invalid(format!(
                    "Image URL exceeds maximum length of {} characters",
                    MAX_URL_CHARS
                )));
            }
            return Ok(Self::Remote(raw.to_string()));
        }

        Err(ValidationError::invalid(
            "Images must be data URLs or http(s) URLs",
        ))
    }

    /// The URL handed to the vision model.
    pub fn as_url(&self) -> &str {
        match self {
            Self::Inline { data_url, .. } => data_url,
            Self::Remote(url) => url,
        }
    }
}

impl StyleAnalysisRequest {
    /// Validate the image count and each image reference.
    pub fn validate(&self) -> ValidationResult<Vec<SampleImage>> {
        if self.images.len() < MIN_STYLE_IMAGES || self.images.len() > MAX_STYLE_IMAGES {
            return Err(ValidationError::ImageCount {
                min: MIN_STYLE_IMAGES,
                max: MAX_STYLE_IMAGES,
            });
        }
        self.images.iter().map(|raw| SampleImage::parse(raw)).collect()
    }
}

/// Response body for style analysis.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StyleAnalysisResponse {
    pub success: bool,
    pub style_guide: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_image_count_bounds() {
        let none = StyleAnalysisRequest { images: vec![] };
        let six = StyleAnalysisRequest { images: vec![PIXEL.to_string(); 6] };
        let five = StyleAnalysisRequest { images: vec![PIXEL.to_string(); 5] };

        assert_eq!(none.validate().unwrap_err().to_string(), "Provide 1-5 sample images");
        assert_eq!(six.validate().unwrap_err().to_string(), "Provide 1-5 sample images");
        assert_eq!(five.validate().unwrap().len(), 5);
    }

    #[test]
    fn test_parse_inline_image() {
        match SampleImage::parse(PIXEL).unwrap() {
            SampleImage::Inline { mime, .. } => assert_eq!(mime, "image/png"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_inputs() {
        assert!(SampleImage::parse("data:text/html;base64,PGgxPg==").is_err());
        assert!(SampleImage::parse("data:image/png,raw").is_err());
        assert!(SampleImage::parse("data:image/png;base64,").is_err());
        assert!(SampleImage::parse("ftp://example.com/a.png").is_err());
        assert!(SampleImage::parse("javascript:alert(1)").is_err());
    }

    #[test]
    fn test_parse_remote_image() {
        assert_eq!(
            SampleImage::parse(" https://cdn.example.com/a.png ").unwrap(),
            SampleImage::Remote("https://cdn.example.com/a.png".to_string())
        );
    }
}
