//! Chat-completion client.

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl, MessageContent, ResponseFormat,
};

/// OpenAI-compatible chat-completion client.
pub struct ChatClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    /// Create a new chat client. A missing key is reported when a call is made.
    pub fn new(config: &AiConfig) -> AiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    /// Whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a system + user prompt and ask for a JSON object back.
    pub async fn complete_json(&self, system: &str, prompt: &str) -> AiResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: MessageContent::Text(system) },
                ChatMessage { role: "user", content: MessageContent::Text(prompt) },
            ],
            response_format: Some(ResponseFormat { kind: "json_object" }),
            temperature: Some(0.7),
        };
        self.send(&request).await
    }

    /// Send a prompt with attached images and return plain text.
    pub async fn complete_vision(
        &self,
        system: &str,
        prompt: &str,
        image_urls: &[&str],
    ) -> AiResult<String> {
        let mut parts = Vec::with_capacity(image_urls.len() + 1);
        parts.push(ContentPart::Text { text: prompt });
        parts.extend(
            image_urls
                .iter()
                .map(|&url| ContentPart::ImageUrl { image_url: ImageUrl { url } }),
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: MessageContent::Text(system) },
                ChatMessage { role: "user", content: MessageContent::Parts(parts) },
            ],
            response_format: None,
            temperature: Some(0.4),
        };
        self.send(&request).await
    }

    async fn send(&self, request: &ChatRequest<'_>) -> AiResult<String> {
        let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured("LLM_API_KEY"))?;
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let err = AiError::from_status(status, body);
            warn!(status = %status, kind = err.kind(), "Chat completion failed");
            return Err(err);
        }

        let chat: ChatResponse = response.json().await?;
        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::InvalidResponse("No choices in response".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(AiError::ContentPolicy(refusal));
        }
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(AiError::ContentPolicy("content_filter".to_string()));
        }

        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AiError::InvalidResponse("Empty message content".to_string()))
    }
}

/// Parse a model reply as JSON, tolerating markdown code fences.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> AiResult<T> {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);

    serde_json::from_str(text.trim()).map_err(AiError::from)
}
