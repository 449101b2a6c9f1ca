//! Image-generation client.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{redirect, Client};
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::guard::PublicResolver;
use crate::types::{ImageRequest, ImageResponse};

/// What the image API handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Temporary URL hosted by the provider
    Url(String),
    /// Inline image bytes
    Bytes(Vec<u8>),
}

/// A generated image.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub payload: ImagePayload,
    /// Prompt as rewritten by the provider, if it did so
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    /// The provider URL, when the image was returned by reference.
    pub fn temporary_url(&self) -> Option<&str> {
        match &self.payload {
            ImagePayload::Url(url) => Some(url),
            ImagePayload::Bytes(_) => None,
        }
    }
}

/// OpenAI-compatible image-generation client.
pub struct ImageClient {
    http: Client,
    /// Fetches user-influenced URLs: no redirects, public addresses only
    fetch: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    size: String,
}

impl ImageClient {
    /// Create a new image client.
    pub fn new(config: &AiConfig) -> AiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        let fetch = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .dns_resolver(Arc::new(PublicResolver))
            .build()?;

        Ok(Self {
            http,
            fetch,
            base_url: config.image_base_url.trim_end_matches('/').to_string(),
            api_key: config.image_api_key.clone(),
            model: config.image_model.clone(),
            size: config.image_size.clone(),
        })
    }

    /// Whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a single image from a prompt.
    pub async fn generate(&self, prompt: &str) -> AiResult<GeneratedImage> {
        let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured("IMAGE_API_KEY"))?;
        let url = format!("{}/images/generations", self.base_url);

        debug!(model = %self.model, size = %self.size, "Sending image generation request");

        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: &self.size,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let err = AiError::from_status(status, body);
            warn!(status = %status, kind = err.kind(), "Image generation failed");
            return Err(err);
        }

        let body: ImageResponse = response.json().await?;
        let data = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AiError::InvalidResponse("No image in response".to_string()))?;

        let payload = match (data.url, data.b64_json) {
            (Some(url), _) if !url.is_empty() => ImagePayload::Url(url),
            (_, Some(b64)) => ImagePayload::Bytes(
                STANDARD
                    .decode(b64.as_bytes())
                    .map_err(|e| AiError::InvalidResponse(format!("Bad base64 image: {}", e)))?,
            ),
            _ => return Err(AiError::InvalidResponse("Image has neither url nor data".to_string())),
        };

        Ok(GeneratedImage {
            payload,
            revised_prompt: data.revised_prompt,
        })
    }

    /// Download an image, refusing bodies larger than `max_bytes`.
    ///
    /// Redirects are not followed and hostnames resolving to internal
    /// addresses are refused.
    pub async fn download(&self, url: &str, max_bytes: usize) -> AiResult<Vec<u8>> {
        let mut response = self.fetch.get(url).send().await?;

        if response.status().is_redirection() {
            warn!(url = %url, status = %response.status(), "Image download redirected, not following");
            return Err(AiError::InvalidResponse(format!(
                "Image URL redirected ({})",
                response.status()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            return Err(AiError::RequestFailed {
                status,
                body: format!("download of {} failed", url),
            });
        }

        if let Some(len) = response.content_length() {
            if len as usize > max_bytes {
                return Err(AiError::InvalidResponse(format!(
                    "Image is {} bytes, limit is {}",
                    len, max_bytes
                )));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AiError::InvalidResponse(format!(
                    "Image exceeds limit of {} bytes",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ImageClient {
        let config = AiConfig {
            image_api_key: Some("test-key".to_string()),
            image_base_url: server.uri(),
            ..Default::default()
        };
        ImageClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": "https://images.example.com/tmp/abc.png", "revised_prompt": "better"}]
            })))
            .mount(&server)
            .await;

        let image = client_for(&server).generate("a cat").await.unwrap();
        assert_eq!(image.temporary_url(), Some("https://images.example.com/tmp/abc.png"));
        assert_eq!(image.revised_prompt.as_deref(), Some("better"));
    }

    #[tokio::test]
    async fn test_generate_decodes_inline_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"b64_json": "aGVsbG8="}]
            })))
            .mount(&server)
            .await;

        let image = client_for(&server).generate("a cat").await.unwrap();
        assert_eq!(image.payload, ImagePayload::Bytes(b"hello".to_vec()));
        assert!(image.temporary_url().is_none());
    }

    #[tokio::test]
    async fn test_content_policy_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Your request was rejected as a result of our safety system.", "code": "content_policy_violation"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("something").await.unwrap_err();
        assert!(matches!(err, AiError::ContentPolicy(_)));
    }

    #[tokio::test]
    async fn test_download_enforces_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = format!("{}/big.png", server.uri());
        assert_eq!(client.download(&url, 64).await.unwrap().len(), 64);
        assert!(client.download(&url, 63).await.is_err());
    }

    #[tokio::test]
    async fn test_download_does_not_follow_redirects() {
        let internal = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("instance-credentials"))
            .expect(0)
            .mount(&internal)
            .await;

        let public = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/headshot.png"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/latest/meta-data/", internal.uri()).as_str()),
            )
            .mount(&public)
            .await;

        let client = client_for(&public);
        let url = format!("{}/headshot.png", public.uri());
        let err = client.download(&url, 1024).await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_download_refuses_hostnames_resolving_internally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 8]))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let port = server.address().port();
        let url = format!("http://localhost:{}/me.png", port);
        assert!(client.download(&url, 1024).await.is_err());
    }
}
