//! Guards and bookkeeping around paid upstream calls.

use std::future::Future;
use std::time::Instant;

use tubemeta_ai::AiResult;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;

/// Spend one unit of the caller's AI budget, or refuse with 429.
pub fn enforce_api_limit(state: &AppState, client: &str) -> ApiResult<()> {
    match state.api_limiter.check_and_increment(client) {
        RateLimitDecision::Allowed => Ok(()),
        RateLimitDecision::Limited { retry_after } => {
            metrics::record_rate_limit_hit("api");
            Err(ApiError::RateLimited { retry_after })
        }
    }
}

/// Await an upstream call, recording its outcome and latency.
pub async fn timed<T, F>(service: &'static str, call: F) -> AiResult<T>
where
    F: Future<Output = AiResult<T>>,
{
    let start = Instant::now();
    let result = call.await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::record_upstream_call(service, outcome, start.elapsed().as_secs_f64());
    result
}
