use condense_common::{CondenseError, MapFailure, Result};
use condense_llm::SummaryLevel;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::document::{Chunk, Summary};
use crate::retry::CallError;
use crate::stage::StageContext;

/// Summarize every chunk, concurrently, returning summaries in chunk order
///
/// A chunk that keeps failing does not stop its siblings, but the run fails
/// afterwards with every failed index.
pub async fn map_chunks(ctx: StageContext<'_>, chunks: &[Chunk]) -> Result<Vec<Summary>> {
    info!(
        "Map phase: summarizing {} chunks (concurrency {})",
        chunks.len(),
        ctx.limiter.limit()
    );

    let mut pending: FuturesUnordered<_> = chunks
        .iter()
        .map(move |chunk| async move {
            let label = format!("chunk {}", chunk.index);
            let result = ctx.summarize(&label, &chunk.text, SummaryLevel::Chunk).await;
            (chunk, result)
        })
        .collect();

    let mut summaries = Vec::with_capacity(chunks.len());
    let mut failures = Vec::new();
    let mut cancelled = false;

    while let Some((chunk, result)) = pending.next().await {
        match result {
            Ok(text) => {
                let tokens = ctx.estimator.estimate(&text);
                debug!(
                    "Summarized chunk {} ({}/{}) - {} chars -> {} tokens",
                    chunk.index,
                    summaries.len() + 1,
                    chunks.len(),
                    chunk.char_len(),
                    tokens
                );
                summaries.push(Summary::for_chunk(chunk, text, tokens));
            }
            Err(CallError::Failed { attempts, error }) => {
                warn!("Chunk {} failed after {} attempt(s): {}", chunk.index, attempts, error);
                failures.push(MapFailure { index: chunk.index, attempts, error });
            }
            Err(CallError::Cancelled) => cancelled = true,
        }
    }

    if cancelled || ctx.cancel.is_cancelled() {
        return Err(CondenseError::Cancelled);
    }

    if !failures.is_empty() {
        failures.sort_by_key(|f| f.index);
        return Err(CondenseError::IncompleteMap { failures });
    }

    // Completion order is arbitrary; reattach by chunk index
    summaries.sort_by_key(|s| s.first_chunk);
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeService, Harness};
    use condense_common::ServiceError;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                index,
                document: 0,
                text: text.to_string(),
                start: 0,
                end: text.chars().count(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_summary_per_chunk_in_order() {
        let harness = Harness::new(FakeService::new(|text, _| Ok(format!("sum({text})"))));
        let input = chunks(&["alpha", "beta", "gamma", "delta", "epsilon"]);

        let summaries = map_chunks(harness.ctx(), &input).await.unwrap();

        let texts: Vec<_> = summaries.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["sum(alpha)", "sum(beta)", "sum(gamma)", "sum(delta)", "sum(epsilon)"]);
        assert!(summaries.iter().all(|s| s.level == SummaryLevel::Chunk && s.round == 0));
        assert_eq!(summaries[2].tokens, "sum(gamma)".len());
        assert_eq!(summaries[4].first_chunk, 4);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_siblings() {
        let harness = Harness::new(FakeService::new(|text, _| {
            if text.starts_with("poison") {
                Err(ServiceError::from_status(400, "rejected"))
            } else {
                Ok(text.to_uppercase())
            }
        }));
        let input = chunks(&["a", "poison-1", "b", "c", "poison-4", "d"]);

        let err = map_chunks(harness.ctx(), &input).await.unwrap_err();

        assert_eq!(err.failed_chunks(), vec![1, 4]);
        // every chunk was attempted exactly once (400 is not retried)
        assert_eq!(harness.service.calls(SummaryLevel::Chunk).len(), 6);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let seen = Mutex::new(HashSet::new());
        let harness = Harness::new(FakeService::new(move |text, _| {
            if seen.lock().unwrap().insert(text.to_string()) {
                Err(ServiceError::RateLimited("slow down".into()))
            } else {
                Ok(format!("ok {text}"))
            }
        }));
        let input = chunks(&["x", "y", "z"]);

        let summaries = map_chunks(harness.ctx(), &input).await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(harness.service.calls(SummaryLevel::Chunk).len(), 6);
    }

    #[tokio::test]
    async fn test_persistent_transient_failure_reports_attempts() {
        let harness = Harness::new(FakeService::new(|_, _| Err(ServiceError::EmptyResponse)));

        let err = map_chunks(harness.ctx(), &chunks(&["only"])).await.unwrap_err();
        match err {
            CondenseError::IncompleteMap { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].attempts, 3);
                assert_eq!(failures[0].error, ServiceError::EmptyResponse);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_map() {
        let harness = Harness::new(FakeService::new(|text, _| Ok(text.to_string())));
        harness.cancel.cancel();

        let err = map_chunks(harness.ctx(), &chunks(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, CondenseError::Cancelled));
        assert!(harness.service.calls(SummaryLevel::Chunk).is_empty());
    }
}
