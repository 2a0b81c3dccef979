use async_trait::async_trait;
use condense_common::{AppConfig, CondenseError, LlmBackend, Result, ServiceError};
use std::sync::Arc;
use tracing::debug;

use crate::client::OllamaClient;
use crate::llm_trait::{LlmClient, SummarizationService};
use crate::openai_client::OpenAiClient;
use crate::prompts::{PromptTemplate, SYSTEM_PROMPT};
use crate::types::{GenerateOptions, GenerateRequest, SummaryLevel};

/// Summarization service backed by an LLM client and two prompt templates
pub struct Summarizer {
    client: Arc<dyn LlmClient>,
    model: String,
    map_prompt: PromptTemplate,
    combine_prompt: PromptTemplate,
    options: GenerateOptions,
}

impl Summarizer {
    /// Create new summarizer with the default prompts
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            map_prompt: PromptTemplate::map_default(),
            combine_prompt: PromptTemplate::combine_default(),
            options: GenerateOptions {
                temperature: Some(0.0),
                top_p: Some(0.9),
                num_predict: Some(512),
            },
        }
    }

    /// Build the client and prompts described by the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client: Arc<dyn LlmClient> = match config.llm_backend {
            LlmBackend::Ollama => Arc::new(OllamaClient::new(
                config.llm_base_url.clone(),
                config.call_timeout(),
            )?),
            LlmBackend::OpenAi => Arc::new(OpenAiClient::new(
                config.llm_base_url.clone(),
                config.llm_api_key.clone(),
                config.call_timeout(),
            )?),
        };

        let num_predict = i32::try_from(config.max_output_tokens).map_err(|_| {
            CondenseError::config(format!("max_output_tokens {} is too large", config.max_output_tokens))
        })?;

        let mut summarizer = Self::new(client, config.llm_model.clone()).with_options(GenerateOptions {
            temperature: Some(config.temperature),
            top_p: Some(0.9),
            num_predict: Some(num_predict),
        });

        if let Some(path) = &config.map_prompt_path {
            summarizer.map_prompt = PromptTemplate::from_file(path)?;
        }
        if let Some(path) = &config.combine_prompt_path {
            summarizer.combine_prompt = PromptTemplate::from_file(path)?;
        }

        Ok(summarizer)
    }

    /// Replace the generation options
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the prompt templates
    pub fn with_prompts(mut self, map_prompt: PromptTemplate, combine_prompt: PromptTemplate) -> Self {
        self.map_prompt = map_prompt;
        self.combine_prompt = combine_prompt;
        self
    }

    /// Model used for every call
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Underlying client
    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    fn build_request(&self, text: &str, level: SummaryLevel) -> GenerateRequest {
        let prompt = match level {
            SummaryLevel::Chunk => self.map_prompt.render(text),
            SummaryLevel::Group => self.combine_prompt.render(text),
        };

        GenerateRequest {
            model: self.model.clone(),
            prompt,
            system: Some(SYSTEM_PROMPT.to_string()),
            stream: Some(false),
            options: Some(self.options.clone()),
        }
    }
}

#[async_trait]
impl SummarizationService for Summarizer {
    async fn summarize(&self, text: &str, level: SummaryLevel) -> std::result::Result<String, ServiceError> {
        let request = self.build_request(text, level);
        debug!(?level, "Summarizing {} chars with {}", text.len(), self.model);

        let response = self.client.generate(request).await?;

        // Clean up the response
        let summary = response.trim();
        if summary.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(summary.to_string())
    }
}
