use condense_common::{AppConfig, ServiceError};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::stage::CallLimiter;

/// Why a service call gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The cancellation token fired
    Cancelled,
    /// Last error after `attempts` tries (1 for non-retryable errors)
    Failed { attempts: u32, error: ServiceError },
}

/// Bounded exponential backoff with a per-call timeout
///
/// The delay after failed attempt `n` is `min(base_delay * 2^(n-1), max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
            call_timeout: config.call_timeout(),
        }
    }

    /// Backoff before the attempt following failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or `cancel` fires
    ///
    /// Each attempt holds one limiter permit for its duration only; waiting
    /// for a permit does not count against the call timeout.
    pub async fn call<T, F, Fut>(
        &self,
        label: &str,
        limiter: &CallLimiter,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CallError::Cancelled),
                permit = limiter.acquire() => permit.ok_or(CallError::Cancelled)?,
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CallError::Cancelled),
                outcome = tokio::time::timeout(self.call_timeout, op()) => outcome,
            };
            drop(permit);

            let error = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => ServiceError::Timeout(format!("no response within {:?}", self.call_timeout)),
            };

            if !error.is_retryable() || attempt >= self.max_attempts {
                return Err(CallError::Failed { attempts: attempt, error });
            }

            let delay = self.delay_for(attempt);
            warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                label, attempt, self.max_attempts, error, delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CallError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
