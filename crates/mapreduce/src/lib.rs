//! Condense map-reduce summarization
//!
//! Chunk documents, summarize every chunk, then combine summaries in
//! budget-bounded groups, round after round, until one summary remains.

mod chunking;
mod document;
mod estimator;
mod grouping;
mod mapper;
mod pipeline;
mod reducer;
mod retry;
mod stage;

#[cfg(test)]
mod test_support;

pub use chunking::{chunk_text, Chunker};
pub use document::{Chunk, Document, Group, Summary};
pub use estimator::{estimator_for, CharEstimator, SizeEstimator, TiktokenEstimator};
pub use grouping::group_summaries;
pub use mapper::map_chunks;
pub use pipeline::{chunk_documents, summarize_documents, PipelineConfig, PipelineReport};
pub use reducer::{reduce_summaries, ReduceOptions};
pub use retry::{CallError, RetryPolicy};
pub use stage::{CallLimiter, StageContext};

pub use condense_llm::SummaryLevel;
