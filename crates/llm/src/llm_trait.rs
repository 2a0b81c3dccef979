use async_trait::async_trait;
use condense_common::{Result, ServiceError};

use crate::types::{GenerateRequest, SummaryLevel};

/// Common trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text from a prompt (single attempt, no retries)
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, ServiceError>;

    /// Test connection/availability
    async fn test_connection(&self) -> Result<bool>;
}

/// Opaque text-in/text-out summarizer used by the map-reduce pipeline
///
/// `level` tells the implementation whether `text` is a raw chunk or a batch
/// of summaries to combine. One call is one attempt; retries belong to the caller.
#[async_trait]
pub trait SummarizationService: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        level: SummaryLevel,
    ) -> std::result::Result<String, ServiceError>;
}
