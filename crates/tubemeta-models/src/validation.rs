//! Request validation helpers and field limits.

use thiserror::Error;

/// Default cap on transcript length (characters).
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 100_000;

/// Maximum channel name length.
pub const MAX_CHANNEL_CHARS: usize = 100;

/// Maximum length of the optional visual context notes.
pub const MAX_VISUAL_CONTEXT_CHARS: usize = 2_000;

/// Maximum length of a free-form video duration string.
pub const MAX_VIDEO_DURATION_CHARS: usize = 32;

/// Style analysis accepts between one and five sample images.
pub const MIN_STYLE_IMAGES: usize = 1;
pub const MAX_STYLE_IMAGES: usize = 5;

/// Maximum size of a single image (upload or inline data URL).
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Thumbnail field limits.
pub const MAX_CONCEPT_CHARS: usize = 1_000;
pub const MAX_TEXT_OVERLAY_CHARS: usize = 60;
pub const MAX_EMOTION_CHARS: usize = 50;
pub const MAX_STYLE_GUIDE_CHARS: usize = 5_000;
pub const MAX_VIDEO_TITLE_CHARS: usize = 200;

/// Maximum URL length accepted in any request field.
pub const MAX_URL_CHARS: usize = 2048;

/// Client-facing validation failure. Messages are safe to return verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Provide {min}-{max} sample images")]
    ImageCount { min: usize, max: usize },

    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trim a required text field and enforce its maximum length in characters.
pub fn require_text(field: &'static str, value: &str, max: usize) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    check_len(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trim an optional text field. Blank values collapse to `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            check_len(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text_trims() {
        assert_eq!(require_text("Channel", "  tech  ", 10).unwrap(), "tech");
    }

    #[test]
    fn test_require_text_blank() {
        assert_eq!(
            require_text("Channel", "   ", 10),
            Err(ValidationError::Required("Channel"))
        );
    }

    #[test]
    fn test_require_text_counts_chars_not_bytes() {
        // Four characters, ten bytes
        assert!(require_text("Emotion", "ééé😀", 4).is_ok());
        assert!(require_text("Emotion", "ééé😀!", 4).is_err());
    }

    #[test]
    fn test_optional_text_blank_is_none() {
        assert_eq!(optional_text("Style guide", Some("  "), 10).unwrap(), None);
        assert_eq!(optional_text("Style guide", None, 10).unwrap(), None);
    }

    #[test]
    fn test_too_long_message_echoes_cap() {
        let err = optional_text("Video title", Some("abcdef"), 3).unwrap_err();
        assert_eq!(err.to_string(), "Video title exceeds maximum length of 3 characters");
    }
}
