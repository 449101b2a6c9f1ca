//! Axum HTTP server for the tubemeta app.
//!
//! This crate provides:
//! - Password login with HMAC-signed session cookies
//! - Fixed-window rate limiting for logins and paid AI calls
//! - Transcript, style and thumbnail endpoints backed by external AI services
//! - Security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::LimiterSweeper;
pub use state::{AppState, Cdn};
