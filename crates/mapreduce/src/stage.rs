use condense_llm::{SummarizationService, SummaryLevel};
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

use crate::estimator::SizeEstimator;
use crate::retry::{CallError, RetryPolicy};

/// Caps the number of outstanding service calls across all stages
#[derive(Debug, Clone)]
pub struct CallLimiter {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl CallLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self { permits: Arc::new(Semaphore::new(limit)), limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a free slot; `None` if the semaphore was closed
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.permits.acquire().await.ok()
    }
}

/// Collaborators shared by every call of a map or reduce stage
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub service: &'a dyn SummarizationService,
    pub estimator: &'a dyn SizeEstimator,
    pub retry: &'a RetryPolicy,
    pub limiter: &'a CallLimiter,
    pub cancel: &'a CancellationToken,
}

impl<'a> StageContext<'a> {
    /// Same collaborators, different cancellation scope
    pub fn with_cancel<'b>(&self, cancel: &'b CancellationToken) -> StageContext<'b>
    where
        'a: 'b,
    {
        StageContext { cancel, ..*self }
    }

    /// One summarization call under the retry policy and the call limiter
    pub async fn summarize(&self, label: &str, text: &str, level: SummaryLevel) -> Result<String, CallError> {
        self.retry
            .call(label, self.limiter, self.cancel, || self.service.summarize(text, level))
            .await
    }
}
