//! Transcript analysis request and the generated YouTube metadata.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::{format_chapter_timestamp, parse_timestamp};
use crate::validation::{
    optional_text, require_text, ValidationError, ValidationResult, MAX_CHANNEL_CHARS,
    MAX_VIDEO_DURATION_CHARS, MAX_VISUAL_CONTEXT_CHARS,
};

/// YouTube rejects tag lists longer than this (sum of tag lengths plus separators).
pub const MAX_TAGS_TOTAL_CHARS: usize = 500;

/// Minimum gap between chapters accepted by YouTube.
pub const MIN_CHAPTER_GAP_SECS: f64 = 10.0;

/// Video duration as sent by the client: seconds or a `HH:MM:SS` style string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum VideoDuration {
    Seconds(f64),
    Text(String),
}

impl VideoDuration {
    /// Resolve to whole seconds.
    pub fn as_secs(&self) -> ValidationResult<f64> {
        match self {
            Self::Seconds(secs) if secs.is_finite() && *secs >= 0.0 => Ok(*secs),
            Self::Seconds(_) => Err(ValidationError::invalid("Video duration must be a positive number")),
            Self::Text(text) => {
                optional_text("Video duration", Some(text), MAX_VIDEO_DURATION_CHARS)?;
                parse_timestamp(text)
                    .map_err(|e| ValidationError::invalid(format!("Invalid video duration: {}", e)))
            }
        }
    }
}

/// Request body for transcript analysis.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeTranscriptRequest {
    /// Full transcript text
    pub transcript: String,
    /// Channel the video is published on
    pub channel: String,
    /// Optional notes about what is on screen
    #[serde(default)]
    pub visual_context: Option<String>,
    /// Optional total video length
    #[serde(default)]
    pub video_duration: Option<VideoDuration>,
}

/// A validated, trimmed transcript analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptJob {
    pub transcript: String,
    pub channel: String,
    pub visual_context: Option<String>,
    pub video_duration_secs: Option<f64>,
}

impl AnalyzeTranscriptRequest {
    /// Validate the request against the configured transcript cap.
    pub fn validate(&self, max_transcript_chars: usize) -> ValidationResult<TranscriptJob> {
        let transcript = require_text("Transcript", &self.transcript, max_transcript_chars)?;
        let channel = require_text("Channel", &self.channel, MAX_CHANNEL_CHARS)?;
        let visual_context = optional_text(
            "Visual context",
            self.visual_context.as_deref(),
            MAX_VISUAL_CONTEXT_CHARS,
        )?;
        let video_duration_secs = match &self.video_duration {
            Some(VideoDuration::Text(text)) if text.trim().is_empty() => None,
            Some(duration) => Some(duration.as_secs()?),
            None => None,
        };

        Ok(TranscriptJob {
            transcript,
            channel,
            visual_context,
            video_duration_secs,
        })
    }
}

/// A thumbnail idea proposed by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailConcept {
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub text_overlay: String,
    #[serde(default)]
    pub emotion: String,
}

/// One chapter marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEntry {
    pub timestamp: String,
    pub title: String,
}

/// Metadata generated for a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_concepts: Vec<ThumbnailConcept>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

impl VideoMetadata {
    /// Clean up model output so it can be pasted into YouTube as-is.
    ///
    /// - titles: trimmed, blanks and duplicates dropped
    /// - tags: `#` stripped, case-insensitive duplicates dropped, total length capped
    /// - hashtags: `#` prefixed, inner whitespace removed, duplicates dropped
    /// - timeline: see [`normalize_timeline`]
    pub fn normalize(mut self, video_duration_secs: Option<f64>) -> Self {
        self.titles = dedupe(self.titles.iter().map(|t| t.trim().to_string()));
        self.description = self.description.trim().to_string();

        self.thumbnail_concepts.retain(|c| !c.concept.trim().is_empty());
        for concept in &mut self.thumbnail_concepts {
            concept.concept = concept.concept.trim().to_string();
            concept.text_overlay = concept.text_overlay.trim().to_string();
            concept.emotion = concept.emotion.trim().to_string();
        }

        let mut budget = MAX_TAGS_TOTAL_CHARS;
        self.tags = dedupe(self.tags.iter().map(|t| t.trim().trim_start_matches('#').trim().to_string()))
            .into_iter()
            .take_while(|tag| {
                // Each tag costs its length plus a comma separator
                let cost = tag.chars().count() + 1;
                if cost > budget {
                    return false;
                }
                budget -= cost;
                true
            })
            .collect();

        self.hashtags = dedupe(self.hashtags.iter().map(|h| {
            let body: String = h
                .trim()
                .trim_start_matches('#')
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if body.is_empty() {
                body
            } else {
                format!("#{}", body)
            }
        }));

        self.timeline = normalize_timeline(&self.timeline, video_duration_secs);
        self
    }
}

/// Response body for transcript analysis.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeTranscriptResponse {
    pub success: bool,
    pub channel: String,
    pub data: VideoMetadata,
}

/// Turn model chapter output into a valid YouTube chapter list.
///
/// Unparseable entries and entries past the end of the video are dropped,
/// the rest are sorted, chapters closer than [`MIN_CHAPTER_GAP_SECS`] to the
/// previous one are dropped, and the first chapter is pinned to `0:00`.
pub fn normalize_timeline(
    entries: &[TimelineEntry],
    video_duration_secs: Option<f64>,
) -> Vec<TimelineEntry> {
    let mut parsed: Vec<(f64, String)> = entries
        .iter()
        .filter_map(|entry| {
            let title = entry.title.trim();
            if title.is_empty() {
                return None;
            }
            let secs = parse_timestamp(&entry.timestamp).ok()?;
            if let Some(duration) = video_duration_secs {
                if secs >= duration {
                    return None;
                }
            }
            Some((secs.floor(), title.to_string()))
        })
        .collect();

    parsed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut result: Vec<(f64, String)> = Vec::with_capacity(parsed.len());
    for (secs, title) in parsed {
        match result.last() {
            Some((prev, _)) if secs - prev < MIN_CHAPTER_GAP_SECS => continue,
            _ => result.push((secs, title)),
        }
    }

    if let Some(first) = result.first_mut() {
        first.0 = 0.0;
    }

    result
        .into_iter()
        .map(|(secs, title)| TimelineEntry {
            timestamp: format_chapter_timestamp(secs),
            title,
        })
        .collect()
}

fn dedupe(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(transcript: &str) -> AnalyzeTranscriptRequest {
        AnalyzeTranscriptRequest {
            transcript: transcript.to_string(),
            channel: "Tech Talks".to_string(),
            visual_context: None,
            video_duration: None,
        }
    }

    #[test]
    fn test_validate_transcript_over_cap_echoes_cap() {
        let err = request(&"a".repeat(51)).validate(50).unwrap_err();
        assert_eq!(err.to_string(), "Transcript exceeds maximum length of 50 characters");
    }

    #[test]
    fn test_validate_requires_channel() {
        let mut req = request("hello");
        req.channel = "  ".to_string();
        assert_eq!(req.validate(100), Err(ValidationError::Required("Channel")));
    }

    #[test]
    fn test_video_duration_forms() {
        let mut req = request("hello");
        req.video_duration = Some(VideoDuration::Text("12:30".to_string()));
        assert_eq!(req.validate(100).unwrap().video_duration_secs, Some(750.0));

        req.video_duration = Some(VideoDuration::Seconds(90.0));
        assert_eq!(req.validate(100).unwrap().video_duration_secs, Some(90.0));

        req.video_duration = Some(VideoDuration::Text("soon".to_string()));
        assert!(req.validate(100).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let body = r#"{"transcript":"t","channel":"c","extra":true}"#;
        assert!(serde_json::from_str::<AnalyzeTranscriptRequest>(body).is_err());
    }

    #[test]
    fn test_normalize_timeline_pins_first_and_sorts() {
        let entries = vec![
            TimelineEntry { timestamp: "02:00".into(), title: "Deep dive".into() },
            TimelineEntry { timestamp: "00:05".into(), title: "Intro".into() },
            TimelineEntry { timestamp: "02:04".into(), title: "Too close".into() },
            TimelineEntry { timestamp: "later".into(), title: "Broken".into() },
            TimelineEntry { timestamp: "1:00:00".into(), title: "Past the end".into() },
        ];

        let timeline = normalize_timeline(&entries, Some(600.0));
        assert_eq!(
            timeline,
            vec![
                TimelineEntry { timestamp: "0:00".into(), title: "Intro".into() },
                TimelineEntry { timestamp: "2:00".into(), title: "Deep dive".into() },
            ]
        );
    }

    #[test]
    fn test_normalize_tags_and_hashtags() {
        let metadata = VideoMetadata {
            titles: vec![" First ".into(), "first".into(), "".into()],
            tags: vec!["#rust".into(), "Rust".into(), "axum".into()],
            hashtags: vec!["rust lang".into(), "#Rust".into(), "#".into()],
            ..Default::default()
        }
        .normalize(None);

        assert_eq!(metadata.titles, vec!["First"]);
        assert_eq!(metadata.tags, vec!["rust", "axum"]);
        assert_eq!(metadata.hashtags, vec!["#rustlang", "#Rust"]);
    }

    #[test]
    fn test_tags_respect_total_budget() {
        let metadata = VideoMetadata {
            tags: (0..100).map(|i| format!("tag-number-{:03}", i)).collect(),
            ..Default::default()
        }
        .normalize(None);

        let total: usize = metadata.tags.iter().map(|t| t.len() + 1).sum();
        assert!(total <= MAX_TAGS_TOTAL_CHARS);
        assert!(!metadata.tags.is_empty());
    }
}
