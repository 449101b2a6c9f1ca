//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during image processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Image too small: {width}x{height}")]
    TooSmall { width: u32, height: u32 },
}

impl MediaError {
    pub(crate) fn decode(what: &'static str, source: image::ImageError) -> Self {
        Self::Decode { what, source }
    }
}
