//! Prompt templates for the LLM and image model.

use tubemeta_models::{format_chapter_timestamp, ThumbnailSpec, TranscriptJob};

/// System prompt for transcript analysis.
pub const METADATA_SYSTEM_PROMPT: &str = r#"You are a YouTube growth strategist who writes metadata for creators.
You write titles that earn clicks without misleading viewers, descriptions that rank in search, and chapter markers that match the actual flow of the video.
You always answer with a single JSON object and nothing else."#;

/// System prompt for style analysis.
pub const STYLE_SYSTEM_PROMPT: &str = r#"You are an art director who reverse-engineers the visual identity of YouTube channels from their thumbnails.
You describe what you see precisely enough that an illustrator who has never seen the images could reproduce the look."#;

/// Build the prompt for metadata generation from a transcript.
pub fn build_metadata_prompt(job: &TranscriptJob) -> String {
    let mut prompt = format!("CHANNEL: {}\n", job.channel);

    if let Some(secs) = job.video_duration_secs {
        prompt.push_str(&format!(
            "VIDEO LENGTH: {}\n",
            format_chapter_timestamp(secs)
        ));
    }

    if let Some(context) = &job.visual_context {
        prompt.push_str("\nWHAT IS ON SCREEN:\n");
        prompt.push_str(context);
        prompt.push('\n');
    }

    prompt.push_str("\nTRANSCRIPT:\n");
    prompt.push_str(&job.transcript);

    let chapter_rule = match job.video_duration_secs {
        Some(secs) => format!(
            "- Every chapter timestamp must be before {}",
            format_chapter_timestamp(secs)
        ),
        None => "- Chapter timestamps must follow the order of the transcript".to_string(),
    };

    prompt.push_str(&format!(
        r##"

Write YouTube metadata for this video.
- 5 title options, each under 70 characters, in the channel's voice
- A description of 150-300 words: a hook in the first two lines, then a summary, then a call to action
- 3 thumbnail concepts, each with a short text overlay (max 4 words) and the emotion to convey
- 15-25 search tags, most specific first
- 3-5 hashtags
- Chapters: the first at 0:00, at least 10 seconds apart
{}

IMPORTANT: Return ONLY a single JSON object with this schema:
{{
  "titles": ["Title"],
  "description": "Description",
  "thumbnail_concepts": [
    {{ "concept": "What the image shows", "text_overlay": "TEXT", "emotion": "shocked" }}
  ],
  "tags": ["tag"],
  "hashtags": ["#hashtag"],
  "timeline": [
    {{ "timestamp": "0:00", "title": "Intro" }}
  ]
}}"##,
        chapter_rule
    ));

    prompt
}

/// Build the prompt sent alongside sample thumbnails.
pub fn build_style_prompt(image_count: usize) -> String {
    format!(
        r#"Here are {} thumbnails from the same channel.

Write a style guide for new thumbnails on this channel. Cover:
- Color palette (name the dominant colors and how they are combined)
- Typography (weight, case, outline or shadow, placement, how many words)
- Composition (where the subject sits, framing, use of negative space)
- Subject treatment (facial expressions, cut-outs, glow or outline effects)
- Background style (photo, gradient, illustration, blur)
- Recurring graphic elements (arrows, circles, emoji, borders)

Be concrete. Write it as instructions to an illustrator, under 400 words."#,
        image_count
    )
}

/// Build the image-generation prompt for a thumbnail.
pub fn build_thumbnail_prompt(spec: &ThumbnailSpec) -> String {
    let mut prompt = format!(
        "A YouTube thumbnail, 16:9, for the channel \"{}\".\n",
        spec.channel
    );

    if let Some(title) = &spec.video_title {
        prompt.push_str(&format!("Video title: \"{}\".\n", title));
    }

    prompt.push_str(&format!("Scene: {}\n", spec.concept));
    prompt.push_str(&format!("Mood: {}, expressed clearly at a glance.\n", spec.emotion));

    if spec.text_overlay.is_empty() {
        prompt.push_str("Do not render any text in the image.\n");
    } else {
        prompt.push_str(&format!(
            "Render the text \"{}\" in large, bold, high-contrast letters that stay legible at small sizes.\n",
            spec.text_overlay
        ));
    }

    if spec.headshot_url.is_some() {
        prompt.push_str(
            "Leave the bottom-right third of the frame free of important detail; a presenter photo will be placed there.\n",
        );
    }

    if let Some(style) = &spec.style_guide {
        prompt.push_str("\nFollow this channel style guide:\n");
        prompt.push_str(style);
        prompt.push('\n');
    }

    prompt.push_str("\nVivid colors, strong contrast, a single clear focal point, no watermarks or borders.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> TranscriptJob {
        TranscriptJob {
            transcript: "Today we build a rate limiter.".to_string(),
            channel: "Rustacean Station".to_string(),
            visual_context: Some("Split screen code editor".to_string()),
            video_duration_secs: Some(754.0),
        }
    }

    fn spec() -> ThumbnailSpec {
        ThumbnailSpec {
            concept: "Crab holding a stopwatch".to_string(),
            text_overlay: "TOO FAST".to_string(),
            emotion: "surprised".to_string(),
            channel: "Rustacean Station".to_string(),
            style_guide: None,
            headshot_url: None,
            video_title: None,
        }
    }

    #[test]
    fn test_metadata_prompt_includes_inputs() {
        let prompt = build_metadata_prompt(&job());
        assert!(prompt.contains("CHANNEL: Rustacean Station"));
        assert!(prompt.contains("VIDEO LENGTH: 12:34"));
        assert!(prompt.contains("Split screen code editor"));
        assert!(prompt.contains("Today we build a rate limiter."));
        assert!(prompt.contains("before 12:34"));
        assert!(prompt.contains("\"thumbnail_concepts\""));
    }

    #[test]
    fn test_metadata_prompt_without_optionals() {
        let job = TranscriptJob {
            visual_context: None,
            video_duration_secs: None,
            ..job()
        };
        let prompt = build_metadata_prompt(&job);
        assert!(!prompt.contains("VIDEO LENGTH"));
        assert!(!prompt.contains("WHAT IS ON SCREEN"));
        assert!(prompt.contains("follow the order of the transcript"));
    }

    #[test]
    fn test_thumbnail_prompt_text_overlay() {
        let prompt = build_thumbnail_prompt(&spec());
        assert!(prompt.contains("\"TOO FAST\""));
        assert!(!prompt.contains("Do not render any text"));

        let silent = ThumbnailSpec {
            text_overlay: String::new(),
            ..spec()
        };
        assert!(build_thumbnail_prompt(&silent).contains("Do not render any text"));
    }

    #[test]
    fn test_thumbnail_prompt_headshot_and_style() {
        let prompt = build_thumbnail_prompt(&ThumbnailSpec {
            headshot_url: Some("https://cdn.example.com/h.png".to_string()),
            style_guide: Some("Neon green outlines".to_string()),
            ..spec()
        });
        assert!(prompt.contains("bottom-right third"));
        assert!(prompt.contains("Neon green outlines"));
        assert!(!prompt.contains("https://cdn.example.com"));
    }

    #[test]
    fn test_style_prompt_counts_images() {
        assert!(build_style_prompt(3).starts_with("Here are 3 thumbnails"));
    }
}
