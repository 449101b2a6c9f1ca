//! AI client error types.

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::ApiErrorEnvelope;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Upstream rejected credentials ({status}): {body}")]
    Unauthorized { status: StatusCode, body: String },

    #[error("Upstream rate limited: {0}")]
    RateLimited(String),

    #[error("Upstream content policy rejection: {0}")]
    ContentPolicy(String),

    #[error("Upstream returned {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Upstream timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

impl AiError {
    /// Classify a non-success upstream response.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let code = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error.code.or(e.error.kind))
            .unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized { status, body },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(body),
            StatusCode::BAD_REQUEST if is_content_policy_code(&code) || mentions_safety(&body) => {
                Self::ContentPolicy(body)
            }
            _ => Self::RequestFailed { status, body },
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::Unauthorized { .. } => "unauthorized",
            Self::RateLimited(_) => "rate_limited",
            Self::ContentPolicy(_) => "content_policy",
            Self::RequestFailed { .. } => "request_failed",
            Self::InvalidResponse(_) | Self::Json(_) => "invalid_response",
            Self::Timeout => "timeout",
            Self::Network(_) => "network",
        }
    }

    /// Message that is safe to show to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "Service is not configured",
            Self::Unauthorized { .. } => "AI service authentication failed",
            Self::RateLimited(_) => "AI service is busy, please retry shortly",
            Self::ContentPolicy(_) => {
                "The request was rejected by the content policy. Try rephrasing the concept"
            }
            Self::Timeout => "AI service timed out, please retry",
            Self::RequestFailed { .. }
            | Self::InvalidResponse(_)
            | Self::Json(_)
            | Self::Network(_) => "AI service request failed",
        }
    }
}

fn is_content_policy_code(code: &str) -> bool {
    matches!(
        code,
        "content_policy_violation" | "moderation_blocked" | "safety_violation"
    )
}

fn mentions_safety(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("content policy") || lower.contains("safety system")
}
