use async_trait::async_trait;
use condense_common::{CondenseError, Result, ServiceError};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, info};

use crate::llm_trait::LlmClient;
use crate::types::{ChatRequest, ChatResponse, GenerateRequest};

/// OpenAI-compatible chat completions client (OpenAI, LM Studio, vLLM, ...)
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiClient {
    /// Create new client; an empty key is treated as no key
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let api_key = api_key.filter(|k| !k.is_empty());
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CondenseError::config(format!("Failed to create HTTP client: {}", e)))?;

        info!("OpenAI-compatible client initialized: {}", base_url);
        Ok(Self { base_url, api_key, client })
    }

    /// Resolve the chat completions endpoint from the base URL
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_root())
    }

    fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/chat/completions").unwrap_or(base);
        if base.ends_with("/v1") {
            base.to_string()
        } else {
            format!("{}/v1", base)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, ServiceError> {
        let body = ChatRequest::from(request);

        debug!(
            "Sending chat request - Model: {}, Messages: {}",
            body.model,
            body.messages.len()
        );

        let response = self
            .authorize(self.client.post(self.endpoint()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status.as_u16(), body));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        match result.first_content() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(ServiceError::EmptyResponse),
        }
    }

    async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_root());

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(ServiceError::from)?;
        Ok(response.status().is_success())
    }
}
