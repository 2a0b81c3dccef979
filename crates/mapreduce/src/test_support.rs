use async_trait::async_trait;
use condense_common::ServiceError;
use condense_llm::{SummarizationService, SummaryLevel};
use std::sync::Mutex;
use std::time::Duration;

use crate::estimator::SizeEstimator;
use crate::retry::RetryPolicy;
use crate::stage::{CallLimiter, StageContext};
use tokio_util::sync::CancellationToken;

type Reply = Box<dyn Fn(&str, SummaryLevel) -> Result<String, ServiceError> + Send + Sync>;
type Delay = Box<dyn Fn(&str) -> Duration + Send + Sync>;

/// Scripted summarization service that records every call
pub struct FakeService {
    reply: Reply,
    delay: Delay,
    calls: Mutex<Vec<(SummaryLevel, String)>>,
}

impl FakeService {
    pub fn new(reply: impl Fn(&str, SummaryLevel) -> Result<String, ServiceError> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            delay: Box::new(|_| Duration::ZERO),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold each call for a time chosen from its input
    pub fn with_delay_by(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    /// Inputs of every call made at `level`, in call order
    pub fn calls(&self, level: SummaryLevel) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl SummarizationService for FakeService {
    async fn summarize(&self, text: &str, level: SummaryLevel) -> Result<String, ServiceError> {
        self.calls.lock().unwrap().push((level, text.to_string()));
        let delay = (self.delay)(text);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        (self.reply)(text, level)
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        call_timeout: Duration::from_secs(5),
    }
}

/// Owns everything a `StageContext` borrows
pub struct Harness {
    pub service: FakeService,
    pub retry: RetryPolicy,
    pub limiter: CallLimiter,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn new(service: FakeService) -> Self {
        Self {
            service,
            retry: fast_retry(),
            limiter: CallLimiter::new(4),
            cancel: CancellationToken::new(),
        }
    }

    /// Context measuring size as one token per character
    pub fn ctx(&self) -> StageContext<'_> {
        StageContext {
            service: &self.service,
            estimator: &CharTokens,
            retry: &self.retry,
            limiter: &self.limiter,
            cancel: &self.cancel,
        }
    }
}

/// One token per character
pub struct CharTokens;

impl SizeEstimator for CharTokens {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count()
    }
}
