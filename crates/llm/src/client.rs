use async_trait::async_trait;
use condense_common::{CondenseError, Result, ServiceError};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::LlmClient;
use crate::types::{GenerateRequest, GenerateResponse};

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: Client,
}

impl OllamaClient {
    /// Create new Ollama client
    ///
    /// `timeout` is the transport deadline; the pipeline enforces its own per-call timeout on top.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CondenseError::config(format!("Failed to create HTTP client: {}", e)))?;

        info!("Ollama client initialized: {}", base_url);
        Ok(Self { base_url, client })
    }

    /// Base URL the client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single attempt to generate text
    async fn try_generate(&self, request: &GenerateRequest) -> std::result::Result<String, ServiceError> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status.as_u16(), body));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        if result.response.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        debug!(
            "Received response from Ollama - Model: {}, Length: {}, Done: {}",
            result.model,
            result.response.len(),
            result.done
        );

        Ok(result.response)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, ServiceError> {
        let mut request = request;
        request.stream = Some(false);
        self.try_generate(&request).await
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ServiceError::from)?;
        Ok(response.status().is_success())
    }
}
