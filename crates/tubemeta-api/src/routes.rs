//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    analyze_style, analyze_transcript, favicon, generate_thumbnail, health, index_page, login,
    login_page, logout, ready, session_status, upload_headshot, HEADSHOT_BODY_LIMIT,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, require_session,
    security_headers,
};
use crate::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/auth", get(session_status).post(login).delete(logout))
        .route("/analyze", post(analyze_transcript))
        .route("/style", post(analyze_style))
        .route("/thumbnail", post(generate_thumbnail))
        .route(
            "/headshot",
            post(upload_headshot).layer(DefaultBodyLimit::max(HEADSHOT_BODY_LIMIT)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let page_routes = Router::new()
        .route("/", get(index_page))
        .route("/login", get(login_page))
        .route("/favicon.ico", get(favicon))
        .nest_service("/static", ServeDir::new(&state.config.static_dir));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(page_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Everything above is behind the session gate except its public paths
        .layer(middleware::from_fn_with_state(state.clone(), require_session))
        // Inline style samples need more than axum's 2 MB extractor default
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
