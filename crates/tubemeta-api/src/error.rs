//! API error types.

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use tubemeta_ai::AiError;
use tubemeta_media::MediaError;
use tubemeta_models::ValidationError;
use tubemeta_storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited { retry_after: Duration },

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] AiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(AiError::ContentPolicy(_)) => StatusCode::BAD_REQUEST,
            ApiError::NotConfigured(_)
            | ApiError::Internal(_)
            | ApiError::Upstream(_)
            | ApiError::Storage(_)
            | ApiError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) | ApiError::Validation(_) => "invalid_request",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::NotConfigured(_) => "not_configured",
            ApiError::Upstream(AiError::NotConfigured(_)) => "not_configured",
            ApiError::Upstream(AiError::ContentPolicy(_)) => "content_policy",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Media(_) => "internal_error",
        }
    }

    /// Message returned to the client. Upstream and internal details stay in
    /// the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Unauthorized(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Validation(e) => e.to_string(),
            ApiError::RateLimited { .. } => "Too many requests. Please try again later.".to_string(),
            ApiError::NotConfigured(_) => "Service is not configured".to_string(),
            ApiError::Upstream(e) => e.user_message().to_string(),
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Media(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(code = self.code(), "{}", self);
        } else if matches!(self, ApiError::Upstream(_)) {
            warn!(code = self.code(), "{}", self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.public_message(),
            code: Some(self.code().to_string()),
        };

        match self {
            ApiError::RateLimited { retry_after } => {
                let secs = retry_after.as_millis().div_ceil(1000).max(1).to_string();
                (status, [(header::RETRY_AFTER, secs)], Json(body)).into_response()
            }
            _ => (status, Json(body)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode as UpstreamStatus;

    #[test]
    fn test_upstream_mapping() {
        let policy = ApiError::from(AiError::ContentPolicy("raw upstream text".into()));
        assert_eq!(policy.status_code(), StatusCode::BAD_REQUEST);
        assert!(!policy.public_message().contains("raw upstream"));

        let auth = ApiError::from(AiError::Unauthorized {
            status: UpstreamStatus::UNAUTHORIZED,
            body: "sk-leaked".into(),
        });
        assert_eq!(auth.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(auth.public_message(), "AI service authentication failed");

        let busy = ApiError::from(AiError::RateLimited("slow down".into()));
        assert_eq!(busy.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(busy.public_message(), "AI service is busy, please retry shortly");
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = ApiError::from(ValidationError::ImageCount { min: 1, max: 5 });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Provide 1-5 sample images");
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = ApiError::internal("db password is hunter2");
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }
}
