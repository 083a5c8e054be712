//! HTTP client for the assistant backend
//!
//! Talks to the four JSON endpoints under `/api/` with `reqwest`. Every
//! non-2xx status is turned into [`MiraError::Api`] so callers only need to
//! distinguish success from failure.

use super::{AssistantApi, BackendStatus, ChatRequest, ChatResponse};
use crate::config::ApiConfig;
use crate::error::{MiraError, Result};

use async_trait::async_trait;
use reqwest::{Client, Response};
use url::Url;

/// `reqwest`-backed [`AssistantApi`]
///
/// # Examples
///
/// ```
/// use mira::api::HttpAssistantClient;
/// use mira::config::ApiConfig;
///
/// let client = HttpAssistantClient::new(&ApiConfig::default()).unwrap();
/// assert_eq!(client.base_url().as_str(), "http://localhost:8000/");
/// ```
#[derive(Debug, Clone)]
pub struct HttpAssistantClient {
    client: Client,
    base_url: Url,
}

impl HttpAssistantClient {
    /// Create a client from the API configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL does not parse or the HTTP client
    /// cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            MiraError::Config(format!("Invalid api.base_url {}: {}", config.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("mira/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MiraError::Api(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized assistant client: base_url={}", base_url);

        Ok(Self { client, base_url })
    }

    /// Base URL every endpoint is resolved against (always ends with `/`)
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| MiraError::Config(format!("Invalid endpoint {}: {}", path, e)).into())
    }

    /// Fail on non-2xx, keeping the start of the body for the log
    async fn check_status(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        Err(MiraError::Api(format!("{} returned {}: {}", what, status, snippet)).into())
    }
}

#[async_trait]
impl AssistantApi for HttpAssistantClient {
    async fn initialize(&self) -> Result<()> {
        let url = self.endpoint("api/initialize")?;
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).send().await.map_err(MiraError::Http)?;
        Self::check_status(response, "POST /api/initialize").await?;
        Ok(())
    }

    async fn chat(&self, message: &str) -> Result<ChatResponse> {
        let url = self.endpoint("api/chat")?;
        tracing::debug!("POST {} ({} chars)", url, message.chars().count());
        let response = self
            .client
            .post(url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(MiraError::Http)?;
        let response = Self::check_status(response, "POST /api/chat").await?;

        let body = response.text().await.map_err(MiraError::Http)?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| MiraError::Api(format!("Malformed chat response: {}", e)))?;
        tracing::debug!(
            source_type = ?parsed.source_type,
            sources = parsed.sources.len(),
            "Received chat answer"
        );
        Ok(parsed)
    }

    async fn clear(&self) -> Result<()> {
        let url = self.endpoint("api/clear")?;
        tracing::debug!("POST {}", url);
        self.client.post(url).send().await.map_err(MiraError::Http)?;
        Ok(())
    }

    async fn status(&self) -> Result<BackendStatus> {
        let url = self.endpoint("api/status")?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(MiraError::Http)?;
        let response = Self::check_status(response, "GET /api/status").await?;
        let body = response.text().await.map_err(MiraError::Http)?;
        let status = serde_json::from_str(&body)
            .map_err(|e| MiraError::Api(format!("Malformed status response: {}", e)))?;
        Ok(status)
    }
}
