//! AI client configuration.

use std::time::Duration;

/// Default OpenAI-compatible API base.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the chat and image clients.
#[derive(Clone)]
pub struct AiConfig {
    /// API key for chat completions
    pub llm_api_key: Option<String>,
    /// Base URL for chat completions
    pub llm_base_url: String,
    /// Chat model name
    pub llm_model: String,
    /// API key for image generation (falls back to the chat key)
    pub image_api_key: Option<String>,
    /// Base URL for image generation
    pub image_base_url: String,
    /// Image model name
    pub image_model: String,
    /// Requested image size, e.g. `1792x1024`
    pub image_size: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            llm_model: "gpt-4o".to_string(),
            image_api_key: None,
            image_base_url: DEFAULT_BASE_URL.to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1792x1024".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl AiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let llm_api_key = non_empty_env("LLM_API_KEY");

        Self {
            image_api_key: non_empty_env("IMAGE_API_KEY").or_else(|| llm_api_key.clone()),
            llm_api_key,
            llm_base_url: non_empty_env("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: non_empty_env("LLM_MODEL").unwrap_or(defaults.llm_model),
            image_base_url: non_empty_env("IMAGE_BASE_URL").unwrap_or(defaults.image_base_url),
            image_model: non_empty_env("IMAGE_MODEL").unwrap_or(defaults.image_model),
            image_size: non_empty_env("IMAGE_SIZE").unwrap_or(defaults.image_size),
            timeout: Duration::from_secs(
                std::env::var("AI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

// Keys must never end up in logs
impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<set>"))
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("image_api_key", &self.image_api_key.as_ref().map(|_| "<set>"))
            .field("image_base_url", &self.image_base_url)
            .field("image_model", &self.image_model)
            .field("image_size", &self.image_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.llm_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.llm_api_key.is_none());
    }

    #[test]
    fn test_debug_hides_keys() {
        let config = AiConfig {
            llm_api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
