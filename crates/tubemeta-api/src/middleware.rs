//! API middleware.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::async_trait;
use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, Extensions, HeaderMap, HeaderValue, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::cookie::CookieJar;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::auth::{Authenticated, SESSION_COOKIE};
use crate::config::ClientIpSource;
use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// Key used when the configured source yields no usable address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Per-client rate limiter using governor.
pub type ClientRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Maximum number of clients to track in rate limiter cache.
/// This prevents unbounded memory growth from attackers using many IPs.
const MAX_RATE_LIMITER_ENTRIES: usize = 10_000;

/// Per-client request-per-second guard with automatic cleanup.
#[derive(Clone)]
pub struct RateLimiterCache {
    limiters: Arc<RwLock<HashMap<String, (Arc<ClientRateLimiter>, Instant)>>>,
    quota: Quota,
    /// Time-to-live for cached rate limiters (default: 1 hour)
    ttl: std::time::Duration,
}

impl RateLimiterCache {
    /// Create a new rate limiter cache.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            quota: Quota::per_second(rps),
            ttl: std::time::Duration::from_secs(3600),
        }
    }

    /// Clean up expired rate limiters to prevent memory leaks.
    async fn cleanup_expired(&self) {
        let mut limiters = self.limiters.write().await;
        let now = Instant::now();

        limiters.retain(|_, (_, created_at)| now.duration_since(*created_at) < self.ttl);

        // If still over capacity, remove oldest entries
        if limiters.len() >= MAX_RATE_LIMITER_ENTRIES {
            let mut entries: Vec<_> = limiters.iter().map(|(k, (_, t))| (k.clone(), *t)).collect();
            entries.sort_by_key(|(_, t)| *t);

            let to_remove = limiters.len() + 1 - MAX_RATE_LIMITER_ENTRIES;
            for (key, _) in entries.into_iter().take(to_remove) {
                limiters.remove(&key);
            }
            warn!("Rate limiter cache exceeded capacity, removed {} entries", to_remove);
        }
    }

    /// Get or create a rate limiter for a client.
    pub async fn get_limiter(&self, key: &str) -> Arc<ClientRateLimiter> {
        {
            let limiters = self.limiters.read().await;
            if let Some((limiter, _)) = limiters.get(key) {
                return Arc::clone(limiter);
            }
        }

        let mut limiters = self.limiters.write().await;
        // Double-check after acquiring write lock
        if let Some((limiter, _)) = limiters.get(key) {
            return Arc::clone(limiter);
        }

        if limiters.len() >= MAX_RATE_LIMITER_ENTRIES {
            drop(limiters);
            self.cleanup_expired().await;
            limiters = self.limiters.write().await;
        }

        let limiter = Arc::new(RateLimiter::direct(self.quota));
        limiters.insert(key.to_string(), (Arc::clone(&limiter), Instant::now()));
        limiter
    }

    /// Check rate limit for a client.
    pub async fn check(&self, key: &str) -> bool {
        self.get_limiter(key).await.check().is_ok()
    }
}

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    use axum::http::Method;

    let allowed_headers = [header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN];
    let allowed_methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if origins.iter().any(|o| o == "*") {
        // Wildcard origin - no credentials allowed, can use Any
        CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any)
            .max_age(std::time::Duration::from_secs(600))
    } else {
        // tower-http panics if you combine credentials with wildcard headers
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
            .allow_credentials(true)
            .allow_origin(origins)
            .max_age(std::time::Duration::from_secs(600))
    }
}

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static(
            "accelerometer=(), camera=(), geolocation=(), gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=()",
        ),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static(
            "default-src 'self'; img-src 'self' data: blob: https:; style-src 'self'; script-src 'self'; connect-src 'self'; frame-ancestors 'none'; base-uri 'none'; form-action 'self'",
        ),
    );
    headers.insert(
        "Cross-Origin-Resource-Policy",
        HeaderValue::from_static("same-origin"),
    );

    response
}

/// Request ID middleware.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response<Body> {
    // Only reuse client-provided IDs that look like IDs
    let request_id = request
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .filter(|s| {
            !s.is_empty()
                && s.len() <= 64
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(request_id.clone());
    Span::current().record("request_id", &request_id);

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("X-Request-ID", header_value);
    }

    response
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration = start.elapsed();

    // Skip health check logging
    if path != "/health" && path != "/healthz" && path != "/ready" {
        info!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

/// Per-client request-per-second guard for API routes.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let key = client_key(
        request.headers(),
        request.extensions(),
        &state.config.client_ip_source,
    );

    if !state.flood_guard.check(&key).await {
        warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limit_hit("flood");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            axum::Json(crate::error::ErrorResponse {
                success: false,
                error: "Rate limit exceeded. Please try again later.".to_string(),
                code: Some("rate_limited".to_string()),
            }),
        )
            .into_response();
    }

    next.run(request).await
}

/// Paths reachable without a session.
pub fn is_public_path(path: &str) -> bool {
    matches!(
        path,
        "/login" | "/api/auth" | "/favicon.ico" | "/health" | "/healthz" | "/ready" | "/metrics"
    ) || path.starts_with("/static/")
}

/// Session token from the request cookies, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether the request carries a session cookie that verifies.
pub fn has_valid_session(state: &AppState, headers: &HeaderMap) -> bool {
    match (&state.sessions, session_token(headers)) {
        (Some(codec), Some(token)) => codec.verify(&token),
        _ => false,
    }
}

/// Auth gate: lets public paths through, marks verified sessions, and turns
/// everything else away (401 for the API, a redirect to the login page for
/// pages).
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let path = request.uri().path().to_owned();
    if is_public_path(&path) {
        return next.run(request).await;
    }

    if has_valid_session(&state, request.headers()) {
        request.extensions_mut().insert(Authenticated);
        return next.run(request).await;
    }

    if path == "/api" || path.starts_with("/api/") {
        return ApiError::unauthorized("Authentication required").into_response();
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Redirect::to(&format!("/login?from={}", urlencoding::encode(target))).into_response()
}

/// Resolve the rate-limit key for a request.
///
/// Only the configured source is consulted; with a header source, the first
/// comma-separated value must parse as an IP address.
pub fn client_key(headers: &HeaderMap, extensions: &Extensions, source: &ClientIpSource) -> String {
    let ip: Option<IpAddr> = match source {
        ClientIpSource::Header(name) => headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok()),
        ClientIpSource::Direct => extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip()),
    };

    match ip {
        Some(ip) => ip.to_string(),
        None => {
            warn_unknown_client(&UNKNOWN_CLIENT_WARNED, source);
            UNKNOWN_CLIENT.to_string()
        }
    }
}

static UNKNOWN_CLIENT_WARNED: AtomicBool = AtomicBool::new(false);

/// Warn the first time a request has no usable client address. Returns
/// whether this call logged.
fn warn_unknown_client(warned: &AtomicBool, source: &ClientIpSource) -> bool {
    if warned.swap(true, Ordering::Relaxed) {
        return false;
    }
    warn!(
        source = ?source,
        "Client address unavailable; all such callers share one rate-limit key. \
         Set CLIENT_IP_SOURCE=direct when not running behind a proxy"
    );
    true
}

/// Extractor for the caller's rate-limit key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(client_key(
            &parts.headers,
            &parts.extensions,
            &state.config.client_ip_source,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(HeaderName::from_static(k), HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_client_key_from_trusted_header() {
        let source = ClientIpSource::default();
        let h = headers(&[("x-real-ip", "203.0.113.7"), ("x-forwarded-for", "1.1.1.1")]);
        assert_eq!(client_key(&h, &Extensions::new(), &source), "203.0.113.7");
    }

    #[test]
    fn test_client_key_ignores_untrusted_header() {
        let source = ClientIpSource::default();
        let h = headers(&[("x-forwarded-for", "1.1.1.1")]);
        assert_eq!(client_key(&h, &Extensions::new(), &source), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_unknown_client_warns_once() {
        let warned = AtomicBool::new(false);
        let source = ClientIpSource::default();
        assert!(warn_unknown_client(&warned, &source));
        assert!(!warn_unknown_client(&warned, &source));
        assert!(warned.load(Ordering::Relaxed));
    }

    #[test]
    fn test_client_key_rejects_garbage() {
        let source = ClientIpSource::default();
        let h = headers(&[("x-real-ip", "not-an-ip")]);
        assert_eq!(client_key(&h, &Extensions::new(), &source), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_client_key_direct() {
        let mut ext = Extensions::new();
        ext.insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 5555))));
        let h = headers(&[("x-real-ip", "203.0.113.7")]);
        assert_eq!(client_key(&h, &ext, &ClientIpSource::Direct), "198.51.100.4");
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public_path("/login"));
        assert!(is_public_path("/api/auth"));
        assert!(is_public_path("/static/app.js"));
        assert!(!is_public_path("/"));
        assert!(!is_public_path("/api/analyze"));
        assert!(!is_public_path("/staticfoo"));
        assert!(!is_public_path("/api/auth/extra"));
    }

    #[test]
    fn test_session_token_from_cookie() {
        let h = headers(&[("cookie", "theme=dark; tubemeta_session=abc.def")]);
        assert_eq!(session_token(&h).as_deref(), Some("abc.def"));
        assert_eq!(session_token(&headers(&[("cookie", "theme=dark")])), None);
    }

    #[tokio::test]
    async fn test_flood_guard_limits_per_client() {
        let cache = RateLimiterCache::new(2);
        assert!(cache.check("a").await);
        assert!(cache.check("a").await);
        assert!(!cache.check("a").await);
        assert!(cache.check("b").await);
    }
}
