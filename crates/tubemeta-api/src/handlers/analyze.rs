//! Transcript analysis.

use axum::extract::State;
use axum::Json;
use tracing::info;

use tubemeta_ai::parse_json_reply;
use tubemeta_models::{AnalyzeTranscriptRequest, AnalyzeTranscriptResponse, VideoMetadata};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::middleware::ClientKey;
use crate::services::prompts::{build_metadata_prompt, METADATA_SYSTEM_PROMPT};
use crate::services::{enforce_api_limit, timed};
use crate::state::AppState;

/// `POST /api/analyze`
pub async fn analyze_transcript(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    ApiJson(req): ApiJson<AnalyzeTranscriptRequest>,
) -> ApiResult<Json<AnalyzeTranscriptResponse>> {
    let job = req.validate(state.config.max_transcript_chars)?;
    enforce_api_limit(&state, &client)?;

    let prompt = build_metadata_prompt(&job);
    let reply = timed("chat", state.chat.complete_json(METADATA_SYSTEM_PROMPT, &prompt)).await?;
    let metadata: VideoMetadata = parse_json_reply(&reply)?;
    let data = metadata.normalize(job.video_duration_secs);

    info!(
        channel = %job.channel,
        transcript_chars = job.transcript.chars().count(),
        titles = data.titles.len(),
        chapters = data.timeline.len(),
        "Generated video metadata"
    );

    Ok(Json(AnalyzeTranscriptResponse {
        success: true,
        channel: job.channel,
        data,
    }))
}
