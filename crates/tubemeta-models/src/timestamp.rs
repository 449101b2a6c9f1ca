//! Chapter timestamp parsing and formatting.
//!
//! Accepts the formats language models tend to emit for chapter markers
//! (`HH:MM:SS`, `MM:SS`, `SS`, optional `.mmm`) and renders them the way
//! YouTube expects them in a description (`M:SS` or `H:MM:SS`).

use thiserror::Error;

/// Maximum reasonable video duration (24 hours in seconds).
pub const MAX_VIDEO_DURATION_SECS: f64 = 86400.0;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS, or SS")]
    InvalidFormat(String),

    #[error("Timestamp exceeds maximum allowed duration ({} hours)", .0 / 3600.0)]
    ExceedsMaxDuration(f64),
}

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use tubemeta_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Components are read right to left: seconds, minutes, hours
    const NAMES: [&str; 3] = ["seconds", "minutes", "hours"];
    const SCALES: [f64; 3] = [1.0, 60.0, 3600.0];

    let mut total = 0.0;
    for (idx, part) in parts.iter().rev().enumerate() {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(NAMES[idx], part.to_string()))?;
        if value < 0.0 || value.is_nan() {
            return Err(TimestampError::Negative);
        }
        total += value * SCALES[idx];
    }

    if total > MAX_VIDEO_DURATION_SECS {
        return Err(TimestampError::ExceedsMaxDuration(MAX_VIDEO_DURATION_SECS));
    }

    Ok(total)
}

/// Format whole seconds as a YouTube chapter marker.
///
/// ```
/// use tubemeta_models::timestamp::format_chapter_timestamp;
/// assert_eq!(format_chapter_timestamp(0.0), "0:00");
/// assert_eq!(format_chapter_timestamp(754.0), "12:34");
/// assert_eq!(format_chapter_timestamp(3725.0), "1:02:05");
/// ```
pub fn format_chapter_timestamp(total_secs: f64) -> String {
    let total = total_secs.max(0.0).floor() as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_hh_mm_ss() {
        assert_eq!(parse_timestamp("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_timestamp("01:00:00").unwrap(), 3600.0);
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_timestamp_mm_ss() {
        assert_eq!(parse_timestamp("5:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("53:53").unwrap(), 3233.0);
    }

    #[test]
    fn test_parse_timestamp_with_milliseconds() {
        let result = parse_timestamp("00:00:30.500").unwrap();
        assert!((result - 30.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert_eq!(parse_timestamp("  "), Err(TimestampError::Empty));
        assert!(matches!(parse_timestamp("abc"), Err(TimestampError::InvalidValue("seconds", _))));
        assert!(matches!(parse_timestamp("1:2:3:4"), Err(TimestampError::InvalidFormat(_))));
        assert_eq!(parse_timestamp("-5"), Err(TimestampError::Negative));
        assert!(matches!(parse_timestamp("25:00:01"), Err(TimestampError::ExceedsMaxDuration(_))));
    }

    #[test]
    fn test_format_chapter_timestamp() {
        assert_eq!(format_chapter_timestamp(0.0), "0:00");
        assert_eq!(format_chapter_timestamp(59.9), "0:59");
        assert_eq!(format_chapter_timestamp(600.0), "10:00");
        assert_eq!(format_chapter_timestamp(3600.0), "1:00:00");
    }
}
