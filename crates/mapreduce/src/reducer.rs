use condense_common::{CondenseError, Result, ServiceError};
use condense_llm::SummaryLevel;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::document::{Group, Summary};
use crate::grouping::group_summaries;
use crate::retry::CallError;
use crate::stage::StageContext;

/// Bounds of the reduce stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceOptions {
    /// Maximum cumulative tokens fed to one combine call
    pub token_budget: usize,
    /// Rounds allowed before giving up
    pub max_rounds: usize,
}

/// Combine summaries round after round until exactly one remains
///
/// Every round must shrink the summary count; a round whose grouping cannot
/// (all groups are singletons) fails with `ReduceStalled` before any call.
pub async fn reduce_summaries(
    ctx: StageContext<'_>,
    summaries: Vec<Summary>,
    options: &ReduceOptions,
) -> Result<Summary> {
    if summaries.is_empty() {
        return Err(CondenseError::invalid_input("no summaries to reduce"));
    }

    let mut current = summaries;
    let mut round = 0;

    while current.len() > 1 {
        if round >= options.max_rounds {
            return Err(CondenseError::ReduceTimeout {
                rounds: options.max_rounds,
                remaining: current.len(),
            });
        }
        round += 1;

        let count = current.len();
        let groups = group_summaries(current, options.token_budget);
        if groups.len() >= count {
            return Err(CondenseError::ReduceStalled { round, count });
        }

        info!(
            "Reduce round {}: {} summaries -> {} groups (budget {} tokens)",
            round,
            count,
            groups.len(),
            options.token_budget
        );

        current = reduce_round(ctx, &groups, round).await?;
    }

    current
        .pop()
        .ok_or_else(|| CondenseError::invalid_input("reduction produced no summary"))
}

/// One combine call per group; the first persistent failure cancels the rest of the round
async fn reduce_round(ctx: StageContext<'_>, groups: &[Group], round: usize) -> Result<Vec<Summary>> {
    let round_cancel = ctx.cancel.child_token();
    let round_ctx = ctx.with_cancel(&round_cancel);

    let mut pending: FuturesUnordered<_> = groups
        .iter()
        .enumerate()
        .map(move |(position, group)| async move {
            if group.is_oversized() {
                warn!(
                    "Round {} group {} is oversized ({} tokens); the service may reject it",
                    round,
                    position,
                    group.tokens()
                );
            }
            let label = format!("round {} group {}", round, position);
            let result = round_ctx
                .summarize(&label, &group.combined_text(), SummaryLevel::Group)
                .await;
            (position, group, result)
        })
        .collect();

    let mut reduced: Vec<(usize, Summary)> = Vec::with_capacity(groups.len());
    let mut failure: Option<ServiceError> = None;

    while let Some((position, group, result)) = pending.next().await {
        match result {
            Ok(text) => {
                let tokens = ctx.estimator.estimate(&text);
                debug!(
                    "Round {} group {}: {} summaries, {} -> {} tokens",
                    round,
                    position,
                    group.len(),
                    group.tokens(),
                    tokens
                );
                reduced.push((position, Summary::combined(group, text, tokens, round)));
            }
            Err(CallError::Failed { attempts, error }) => {
                warn!(
                    "Round {} group {} failed after {} attempt(s): {}",
                    round, position, attempts, error
                );
                if failure.is_none() {
                    round_cancel.cancel();
                    failure = Some(error);
                }
            }
            Err(CallError::Cancelled) => {}
        }
    }

    // A partially completed round is discarded
    if ctx.cancel.is_cancelled() {
        return Err(CondenseError::Cancelled);
    }
    if let Some(error) = failure {
        return Err(CondenseError::Service(error));
    }
    if reduced.len() != groups.len() {
        return Err(CondenseError::Cancelled);
    }

    reduced.sort_by_key(|(position, _)| *position);
    Ok(reduced.into_iter().map(|(_, summary)| summary).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;
    use crate::test_support::{FakeService, Harness};
    use std::time::Duration;

    fn summaries(count: usize, size: usize) -> Vec<Summary> {
        (0..count)
            .map(|index| {
                let chunk = Chunk { index, document: index, text: String::new(), start: 0, end: 0 };
                let text = format!("{:0width$}", index, width = size);
                Summary::for_chunk(&chunk, text, size)
            })
            .collect()
    }

    fn options(token_budget: usize, max_rounds: usize) -> ReduceOptions {
        ReduceOptions { token_budget, max_rounds }
    }

    /// Every combine call returns a 100-char summary
    fn compacting() -> FakeService {
        FakeService::new(|_, _| Ok("c".repeat(100)))
    }

    #[tokio::test]
    async fn test_reduces_to_one_summary() {
        let harness = Harness::new(compacting());

        let summary = reduce_summaries(harness.ctx(), summaries(25, 300), &options(1000, 5))
            .await
            .unwrap();

        assert_eq!(summary.level, SummaryLevel::Group);
        assert_eq!(summary.round, 2);
        assert_eq!((summary.first_chunk, summary.last_chunk), (0, 24));

        let calls = harness.service.calls(SummaryLevel::Group);
        // round 1: nine groups, round 2: one group of nine
        assert_eq!(calls.len(), 10);
        let mut first_round: Vec<usize> = calls[..9].iter().map(|t| t.split("\n\n").count()).collect();
        first_round.sort_unstable();
        assert_eq!(first_round, vec![1, 3, 3, 3, 3, 3, 3, 3, 3]);
        assert_eq!(calls[9].split("\n\n").count(), 9);
    }

    #[tokio::test]
    async fn test_single_summary_is_returned_unchanged() {
        let harness = Harness::new(compacting());
        let input = summaries(1, 5000);

        let summary = reduce_summaries(harness.ctx(), input.clone(), &options(10, 1)).await.unwrap();
        assert_eq!(summary, input[0]);
        assert!(harness.service.calls(SummaryLevel::Group).is_empty());
    }

    #[tokio::test]
    async fn test_budget_below_every_summary_stalls() {
        let harness = Harness::new(compacting());

        let err = reduce_summaries(harness.ctx(), summaries(4, 300), &options(100, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, CondenseError::ReduceStalled { round: 1, count: 4 }));
        assert!(harness.service.calls(SummaryLevel::Group).is_empty());
    }

    #[tokio::test]
    async fn test_never_shrinking_service_stalls() {
        // echoes its input, so combined summaries only grow
        let harness = Harness::new(FakeService::new(|text, _| Ok(text.to_string())));

        let err = reduce_summaries(harness.ctx(), summaries(6, 300), &options(1000, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, CondenseError::ReduceStalled { round: 2, count: 2 }));
    }

    #[tokio::test]
    async fn test_round_budget_exhausted() {
        let harness = Harness::new(compacting());

        let err = reduce_summaries(harness.ctx(), summaries(25, 300), &options(1000, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, CondenseError::ReduceTimeout { rounds: 1, remaining: 9 }));
    }

    #[tokio::test]
    async fn test_group_failure_aborts_round() {
        let harness = Harness::new(FakeService::new(|_, _| {
            Err(ServiceError::from_status(413, "payload too large"))
        }));

        let err = reduce_summaries(harness.ctx(), summaries(4, 10), &options(1000, 3))
            .await
            .unwrap_err();

        assert!(matches!(err, CondenseError::Service(ServiceError::Http { status: 413, .. })));
    }

    /// Groups containing summary 1 fail at once; every other group hangs
    fn failing_first_group() -> FakeService {
        FakeService::new(|text, _| {
            if text.contains("00001") {
                Err(ServiceError::from_status(400, "bad group"))
            } else {
                Ok("c".repeat(5))
            }
        })
        .with_delay_by(|text| {
            if text.contains("00001") {
                Duration::ZERO
            } else {
                Duration::from_secs(3600)
            }
        })
    }

    #[tokio::test]
    async fn test_failed_group_cancels_its_siblings() {
        let harness = Harness::new(failing_first_group());

        // two groups of two
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            reduce_summaries(harness.ctx(), summaries(4, 5), &options(10, 3)),
        )
        .await
        .expect("sibling groups should be cancelled");

        assert!(matches!(result, Err(CondenseError::Service(ServiceError::Http { status: 400, .. }))));
        // only the round's own token is cancelled
        assert!(!harness.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_caller_cancel_mid_round() {
        let hanging = FakeService::new(|_, _| Ok("c".repeat(5))).with_delay_by(|_| Duration::from_secs(3600));
        let harness = Harness::new(hanging);
        let cancel = harness.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            reduce_summaries(harness.ctx(), summaries(4, 5), &options(10, 3)),
        )
        .await
        .expect("cancellation should be prompt");

        assert!(matches!(result, Err(CondenseError::Cancelled)));
        assert_eq!(harness.service.calls(SummaryLevel::Group).len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let harness = Harness::new(compacting());
        let err = reduce_summaries(harness.ctx(), Vec::new(), &options(1000, 3)).await.unwrap_err();
        assert!(matches!(err, CondenseError::InvalidInput(_)));
    }
}
