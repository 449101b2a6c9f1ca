//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use url::Url;

use tubemeta_ai::{AiConfig, ChatClient, ImageClient};
use tubemeta_storage::{ObjectStore, R2Client};

use crate::auth::{AuthError, SessionCodec};
use crate::config::ApiConfig;
use crate::middleware::RateLimiterCache;
use crate::rate_limit::{Clock, FixedWindowLimiter, InMemoryStore, SystemClock};

/// Object storage plus the host its public URLs are served from.
#[derive(Clone)]
pub struct Cdn {
    pub store: Arc<dyn ObjectStore>,
    pub host: String,
}

impl Cdn {
    /// Wrap a store whose objects are served under `public_url`.
    pub fn new(store: Arc<dyn ObjectStore>, public_url: &str) -> anyhow::Result<Self> {
        let host = Url::parse(public_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .with_context(|| format!("invalid CDN public URL: {}", public_url))?;
        Ok(Self { store, host })
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    /// `None` when no password is configured; every login then fails with 500
    pub sessions: Option<Arc<SessionCodec>>,
    pub login_limiter: Arc<FixedWindowLimiter>,
    pub api_limiter: Arc<FixedWindowLimiter>,
    pub flood_guard: Arc<RateLimiterCache>,
    pub chat: Arc<ChatClient>,
    pub images: Arc<ImageClient>,
    /// `None` when R2 is not configured
    pub cdn: Option<Cdn>,
}

impl AppState {
    /// Create application state from the environment.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let ai = AiConfig::from_env();

        let cdn = match R2Client::from_env() {
            Ok(client) => {
                let public_url = client.public_base().to_string();
                info!(public_url = %public_url, "CDN uploads enabled");
                Some(Cdn::new(Arc::new(client), &public_url)?)
            }
            Err(e) => {
                warn!("CDN uploads disabled: {}", e);
                None
            }
        };

        Self::from_parts(config, &ai, cdn, Arc::new(SystemClock))
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        config: ApiConfig,
        ai: &AiConfig,
        cdn: Option<Cdn>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let sessions = match SessionCodec::new(config.app_password.as_deref().unwrap_or_default()) {
            Ok(codec) => Some(Arc::new(codec)),
            Err(AuthError::MissingPassword) => {
                warn!("APP_PASSWORD is not set; logins will fail until it is configured");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let limiter = |name: &'static str, policy| {
            Arc::new(FixedWindowLimiter::new(
                name,
                policy,
                Arc::new(InMemoryStore::new(config.rate_limit_max_entries)),
                Arc::clone(&clock),
            ))
        };
        let login_limiter = limiter("login", config.login_policy);
        let api_limiter = limiter("api", config.api_policy);

        if ai.llm_api_key.is_none() {
            warn!("LLM_API_KEY is not set; AI endpoints will return 500");
        }

        Ok(Self {
            flood_guard: Arc::new(RateLimiterCache::new(config.rate_limit_rps)),
            chat: Arc::new(ChatClient::new(ai).context("failed to build chat client")?),
            images: Arc::new(ImageClient::new(ai).context("failed to build image client")?),
            config: Arc::new(config),
            sessions,
            login_limiter,
            api_limiter,
            cdn,
        })
    }
}
