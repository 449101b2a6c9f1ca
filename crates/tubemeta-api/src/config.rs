//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderName;

use crate::rate_limit::{RateLimitPolicy, DEFAULT_MAX_ENTRIES};
use tubemeta_models::validation::DEFAULT_MAX_TRANSCRIPT_CHARS;

/// Where the client identity used for rate limiting comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIpSource {
    /// A header set by a trusted reverse proxy (e.g. `x-real-ip`).
    Header(HeaderName),
    /// The socket peer address, for deployments without a proxy.
    Direct,
}

impl ClientIpSource {
    /// Parse `CLIENT_IP_SOURCE`: `direct`, or a header name.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim().to_ascii_lowercase();
        if raw == "direct" {
            return Ok(Self::Direct);
        }
        HeaderName::from_bytes(raw.as_bytes())
            .map(Self::Header)
            .map_err(|_| format!("invalid CLIENT_IP_SOURCE header name: {}", raw))
    }
}

impl Default for ClientIpSource {
    fn default() -> Self {
        Self::Header(HeaderName::from_static("x-real-ip"))
    }
}

/// API server configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Per-IP flood guard on /api, requests per second
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Shared application password; `None` leaves the app locked
    pub app_password: Option<String>,
    /// Client identity source
    pub client_ip_source: ClientIpSource,
    /// Password attempt limits
    pub login_policy: RateLimitPolicy,
    /// AI call limits
    pub api_policy: RateLimitPolicy,
    /// Max keys tracked per limiter
    pub rate_limit_max_entries: usize,
    /// Interval between stale limiter record sweeps
    pub rate_limit_sweep_interval: Duration,
    /// Transcript length cap in characters
    pub max_transcript_chars: usize,
    /// Directory served under /static
    pub static_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(180),
            max_body_size: 25 * 1024 * 1024, // 25MB, five inline style images
            environment: "development".to_string(),
            app_password: None,
            client_ip_source: ClientIpSource::default(),
            login_policy: RateLimitPolicy::login(),
            api_policy: RateLimitPolicy::api(),
            rate_limit_max_entries: DEFAULT_MAX_ENTRIES,
            rate_limit_sweep_interval: Duration::from_secs(60),
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let client_ip_source = match std::env::var("CLIENT_IP_SOURCE") {
            Ok(raw) if !raw.trim().is_empty() => ClientIpSource::parse(&raw)?,
            _ => defaults.client_ip_source,
        };

        let login_policy = RateLimitPolicy {
            window: Duration::from_secs(env_or("LOGIN_WINDOW_SECS", 15 * 60)),
            max_count: env_or("LOGIN_MAX_ATTEMPTS", defaults.login_policy.max_count),
            backoff_base: Duration::from_millis(env_or("LOGIN_BACKOFF_BASE_MS", 1_000)),
            backoff_cap: Duration::from_millis(env_or("LOGIN_BACKOFF_CAP_MS", 30_000)),
        };

        let api_policy = RateLimitPolicy {
            window: Duration::from_secs(env_or("API_WINDOW_SECS", 60)),
            max_count: env_or("API_MAX_REQUESTS", defaults.api_policy.max_count),
            ..defaults.api_policy
        };

        let config = Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_or("API_PORT", defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_or("RATE_LIMIT_RPS", defaults.rate_limit_rps),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT", 180)),
            max_body_size: env_or("MAX_BODY_SIZE", defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            app_password: std::env::var("APP_PASSWORD").ok().filter(|p| !p.is_empty()),
            client_ip_source,
            login_policy,
            api_policy,
            rate_limit_max_entries: env_or("RATE_LIMIT_MAX_ENTRIES", defaults.rate_limit_max_entries),
            rate_limit_sweep_interval: Duration::from_secs(env_or("RATE_LIMIT_SWEEP_SECS", 60)),
            max_transcript_chars: env_or("MAX_TRANSCRIPT_CHARS", defaults.max_transcript_chars),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.login_policy
            .validate()
            .map_err(|e| format!("login policy: {}", e))?;
        self.api_policy
            .validate()
            .map_err(|e| format!("api policy: {}", e))?;
        if self.max_transcript_chars == 0 {
            return Err("MAX_TRANSCRIPT_CHARS must be positive".to_string());
        }
        if self.rate_limit_sweep_interval.is_zero() {
            return Err("RATE_LIMIT_SWEEP_SECS must be positive".to_string());
        }
        Ok(())
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("app_password", &self.app_password.as_ref().map(|_| "<set>"))
            .field("client_ip_source", &self.client_ip_source)
            .field("login_policy", &self.login_policy)
            .field("api_policy", &self.api_policy)
            .finish_non_exhaustive()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_source_parse() {
        assert_eq!(ClientIpSource::parse("direct").unwrap(), ClientIpSource::Direct);
        assert_eq!(ClientIpSource::parse(" DIRECT ").unwrap(), ClientIpSource::Direct);
        assert_eq!(
            ClientIpSource::parse("CF-Connecting-IP").unwrap(),
            ClientIpSource::Header(HeaderName::from_static("cf-connecting-ip"))
        );
        assert!(ClientIpSource::parse("bad header").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.app_password.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = ApiConfig {
            app_password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
