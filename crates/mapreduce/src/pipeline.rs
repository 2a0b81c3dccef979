use chrono::{DateTime, Utc};
use condense_common::{AppConfig, CondenseError, Result, SplitBoundary};
use condense_llm::SummarizationService;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::chunking::Chunker;
use crate::document::{Chunk, Document, Summary};
use crate::estimator::SizeEstimator;
use crate::mapper::map_chunks;
use crate::reducer::{reduce_summaries, ReduceOptions};
use crate::retry::RetryPolicy;
use crate::stage::{CallLimiter, StageContext};

/// Everything the pipeline needs to know, passed explicitly per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub overlap: usize,
    pub boundary: SplitBoundary,
    /// Maximum tokens per combine call
    pub token_budget: usize,
    pub max_rounds: usize,
    /// Maximum outstanding service calls
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            boundary: config.split_boundary,
            token_budget: config.token_budget,
            max_rounds: config.max_rounds,
            concurrency: config.concurrency,
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Chunker for these settings; fails on invalid chunk parameters
    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunk_size, self.overlap, self.boundary)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunker()?;

        if self.token_budget == 0 {
            return Err(CondenseError::config("token budget must be greater than 0"));
        }
        if self.max_rounds == 0 {
            return Err(CondenseError::config("max rounds must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(CondenseError::config("concurrency must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(CondenseError::config("max attempts must be at least 1"));
        }
        if self.retry.call_timeout.is_zero() {
            return Err(CondenseError::config("call timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// Final summary plus run statistics
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub summary: Summary,
    /// Documents that contributed text
    pub documents: usize,
    pub chunks: usize,
    /// Reduction rounds executed
    pub rounds: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Chunk documents in input order with sequential global indices; blank documents are skipped
pub fn chunk_documents(documents: &[Document], chunker: &Chunker) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for (position, document) in documents.iter().enumerate() {
        if document.is_blank() {
            warn!("Skipping blank document {}", document.label());
            continue;
        }

        for mut chunk in chunker.split(document.text()) {
            chunk.index = chunks.len();
            chunk.document = position;
            chunks.push(chunk);
        }
    }

    chunks
}

/// Summarize a set of documents: chunk, map, reduce
pub async fn summarize_documents(
    service: &dyn SummarizationService,
    estimator: &dyn SizeEstimator,
    documents: &[Document],
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<PipelineReport> {
    config.validate()?;

    let run_id = Uuid::new_v4();
    let span = info_span!("summarize", %run_id);

    async move {
        let started_at = Utc::now();
        let timer = std::time::Instant::now();

        let chunker = config.chunker()?;
        let chunks = chunk_documents(documents, &chunker);
        if chunks.is_empty() {
            return Err(CondenseError::invalid_input("no document text to summarize"));
        }

        let used_documents = documents.iter().filter(|d| !d.is_blank()).count();
        info!(
            "Split {} documents into {} chunks (chunk size {}, overlap {})",
            used_documents,
            chunks.len(),
            config.chunk_size,
            config.overlap
        );

        let limiter = CallLimiter::new(config.concurrency);
        let ctx = StageContext {
            service,
            estimator,
            retry: &config.retry,
            limiter: &limiter,
            cancel,
        };

        let summary = run_stages(ctx, &chunks, config).await?;

        let elapsed_ms = timer.elapsed().as_millis() as u64;
        info!(
            "Summarization finished in {} ms after {} round(s) - {} tokens",
            elapsed_ms, summary.round, summary.tokens
        );

        Ok(PipelineReport {
            run_id,
            rounds: summary.round,
            summary,
            documents: used_documents,
            chunks: chunks.len(),
            started_at,
            elapsed_ms,
        })
    }
    .instrument(span)
    .await
}

async fn run_stages(ctx: StageContext<'_>, chunks: &[Chunk], config: &PipelineConfig) -> Result<Summary> {
    let summaries = map_chunks(ctx, chunks).await?;

    let options = ReduceOptions {
        token_budget: config.token_budget,
        max_rounds: config.max_rounds,
    };
    reduce_summaries(ctx, summaries, &options).await
}
