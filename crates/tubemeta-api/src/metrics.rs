//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "tubemeta_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "tubemeta_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "tubemeta_http_requests_in_flight";

    // Auth metrics
    pub const LOGIN_ATTEMPTS_TOTAL: &str = "tubemeta_login_attempts_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "tubemeta_rate_limit_hits_total";
    pub const RATE_LIMIT_TRACKED_KEYS: &str = "tubemeta_rate_limit_tracked_keys";
    pub const RATE_LIMIT_SWEPT_TOTAL: &str = "tubemeta_rate_limit_swept_total";

    // Upstream metrics
    pub const UPSTREAM_CALLS_TOTAL: &str = "tubemeta_upstream_calls_total";
    pub const UPSTREAM_DURATION_SECONDS: &str = "tubemeta_upstream_duration_seconds";

    // Storage metrics
    pub const UPLOADS_TOTAL: &str = "tubemeta_uploads_total";
    pub const CDN_FALLBACK_TOTAL: &str = "tubemeta_cdn_fallback_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a login attempt by outcome (`success`, `invalid`, `limited`, `unconfigured`).
pub fn record_login_attempt(outcome: &'static str) {
    counter!(names::LOGIN_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(policy: &'static str) {
    counter!(names::RATE_LIMIT_HITS_TOTAL, "policy" => policy).increment(1);
}

/// Record the result of a sweep of stale limiter records.
pub fn record_rate_limit_sweep(policy: &'static str, removed: usize, tracked: usize) {
    counter!(names::RATE_LIMIT_SWEPT_TOTAL, "policy" => policy).increment(removed as u64);
    gauge!(names::RATE_LIMIT_TRACKED_KEYS, "policy" => policy).set(tracked as f64);
}

/// Record an upstream AI call.
pub fn record_upstream_call(service: &'static str, outcome: &'static str, duration_secs: f64) {
    counter!(names::UPSTREAM_CALLS_TOTAL, "service" => service, "outcome" => outcome).increment(1);
    histogram!(names::UPSTREAM_DURATION_SECONDS, "service" => service).record(duration_secs);
}

/// Record an upload to object storage.
pub fn record_upload(kind: &'static str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    counter!(names::UPLOADS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
}

/// Record a thumbnail served from the temporary upstream URL.
pub fn record_cdn_fallback() {
    counter!(names::CDN_FALLBACK_TOTAL).increment(1);
}

/// Collapse paths so labels stay low-cardinality.
fn sanitize_path(path: &str) -> String {
    match path {
        "/" | "/login" | "/favicon.ico" | "/health" | "/healthz" | "/ready" | "/metrics" => {
            path.to_string()
        }
        p if p.starts_with("/static/") => "/static/*".to_string(),
        p if p.starts_with("/api/") => {
            let endpoint = p.trim_start_matches("/api/").split('/').next().unwrap_or_default();
            match endpoint {
                "auth" | "analyze" | "style" | "thumbnail" | "headshot" => format!("/api/{}", endpoint),
                _ => "/api/other".to_string(),
            }
        }
        _ => "other".to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/analyze"), "/api/analyze");
        assert_eq!(sanitize_path("/api/auth"), "/api/auth");
        assert_eq!(sanitize_path("/api/unknown/123"), "/api/other");
        assert_eq!(sanitize_path("/static/app.js"), "/static/*");
        assert_eq!(sanitize_path("/wp-admin.php"), "other");
        assert_eq!(sanitize_path("/"), "/");
    }
}
