//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub password: CheckStatus,
    pub llm: CheckStatus,
    pub image: CheckStatus,
    pub storage: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: Option<u64>) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    /// Optional dependency that is switched off.
    fn disabled() -> Self {
        Self {
            status: "disabled".to_string(),
            error: None,
            latency_ms: None,
        }
    }

    fn configured(present: bool, missing: &str) -> Self {
        if present {
            Self::ok(None)
        } else {
            Self::error(format!("{} is not set", missing))
        }
    }

    fn is_failing(&self) -> bool {
        self.status == "error"
    }
}

/// Readiness check endpoint (readiness probe).
///
/// Required configuration must be present; R2 is optional but, when
/// configured, must answer a bucket check.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let storage = match &state.cdn {
        Some(cdn) => {
            let start = Instant::now();
            match cdn.store.check().await {
                Ok(()) => CheckStatus::ok(Some(start.elapsed().as_millis() as u64)),
                Err(e) => CheckStatus::error(e.to_string()),
            }
        }
        None => CheckStatus::disabled(),
    };

    let checks = ReadinessChecks {
        password: CheckStatus::configured(state.sessions.is_some(), "APP_PASSWORD"),
        llm: CheckStatus::configured(state.chat.is_configured(), "LLM_API_KEY"),
        image: CheckStatus::configured(state.images.is_configured(), "IMAGE_API_KEY"),
        storage,
    };

    let all_ok = !(checks.password.is_failing()
        || checks.llm.is_failing()
        || checks.image.is_failing()
        || checks.storage.is_failing());

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks,
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
