//! Rate-limited call executor.
//!
//! Wraps an outbound model call with the [`RateTracker`] and a bounded
//! retry loop. Each iteration asks the tracker for a slot (which records the
//! call when granted), invokes the operation, and on a rate-limit rejection (local or remote) sleeps
//! before trying again. Any other failure is returned immediately.

mod classify;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::rate_limit::{backoff_delay, duration_secs, RateTracker, MAX_COOLDOWN_PERIOD};

pub use classify::{
    classify_error_text, extract_retry_delay, parse_duration_str, ClassifyFailure, FailureKind,
};

/// Retry budget and backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base of the exponential backoff `base_delay * 2^attempt`.
    #[serde(
        default = "default_base_delay",
        rename = "base_delay_secs",
        with = "duration_secs"
    )]
    pub base_delay: Duration,
    /// Ceiling for computed backoff. Provider-suggested delays are only held
    /// to [`MAX_COOLDOWN_PERIOD`].
    #[serde(
        default = "default_max_delay",
        rename = "max_delay_secs",
        with = "duration_secs"
    )]
    pub max_delay: Duration,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff for the given zero-based attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        backoff_delay(attempt, self.base_delay, self.max_delay)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// What happened on one iteration of the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The operation returned a value.
    Succeeded,
    /// The tracker refused the call; nothing was dispatched.
    Throttled { reason: String },
    /// The provider rejected the call for rate limiting.
    Rejected { retry_after: Option<Duration> },
    /// The operation failed for another reason, or the budget ran out.
    Failed,
}

/// One iteration of the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAttempt {
    /// Zero-based attempt index.
    pub index: u32,
    /// Sleep taken after this attempt before the next one.
    pub delay: Option<Duration>,
    pub outcome: AttemptOutcome,
}

impl CallAttempt {
    fn log(&self, model: &str) {
        debug!(
            model,
            attempt = self.index,
            delay_ms = self.delay.map(|d| d.as_millis() as u64),
            outcome = ?self.outcome,
            "call attempt"
        );
    }
}

/// Terminal errors surfaced by the executor.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError<E> {
    /// The tracker kept refusing the call until the retry budget ran out.
    #[error("Rate limit exceeded for {model}: {reason}. Max retries reached.")]
    RateLimitExceeded {
        model: String,
        reason: String,
        attempts: u32,
    },
    /// The operation failed and was not retried.
    #[error("{0}")]
    Remote(E),
}

impl<E> ExecutorError<E> {
    pub fn is_rate_limit_exceeded(&self) -> bool {
        matches!(self, ExecutorError::RateLimitExceeded { .. })
    }

    /// The wrapped operation's error, if the failure came from it.
    pub fn into_remote(self) -> Option<E> {
        match self {
            ExecutorError::Remote(e) => Some(e),
            ExecutorError::RateLimitExceeded { .. } => None,
        }
    }
}

/// Executes model calls under a shared [`RateTracker`] with bounded retries.
#[derive(Debug, Clone, Default)]
pub struct RateLimitedExecutor {
    tracker: RateTracker,
    policy: RetryPolicy,
}

impl RateLimitedExecutor {
    pub fn new(tracker: RateTracker, policy: RetryPolicy) -> Self {
        Self { tracker, policy }
    }

    pub fn tracker(&self) -> &RateTracker {
        &self.tracker
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` for `model`, retrying rate-limit rejections.
    pub async fn execute<T, E, F, Fut>(
        &self,
        model: &str,
        operation: F,
    ) -> Result<T, ExecutorError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifyFailure + fmt::Display,
    {
        self.execute_traced(model, operation).await.0
    }

    /// Like [`execute`](Self::execute), also returning every attempt made.
    pub async fn execute_traced<T, E, F, Fut>(
        &self,
        model: &str,
        mut operation: F,
    ) -> (Result<T, ExecutorError<E>>, Vec<CallAttempt>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifyFailure + fmt::Display,
    {
        let max_retries = self.policy.max_retries;
        let mut attempts = Vec::new();
        let mut attempt = 0u32;

        loop {
            let decision = self.tracker.acquire(model).await;

            if !decision.allowed() {
                let reason = decision.reason();

                if attempt >= max_retries {
                    let record = CallAttempt {
                        index: attempt,
                        delay: None,
                        outcome: AttemptOutcome::Failed,
                    };
                    record.log(model);
                    attempts.push(record);
                    error!(
                        "Rate limit exceeded for {} after {} attempts: {}",
                        model,
                        attempt + 1,
                        reason
                    );
                    let err = ExecutorError::RateLimitExceeded {
                        model: model.to_string(),
                        reason,
                        attempts: attempt + 1,
                    };
                    return (Err(err), attempts);
                }

                let delay = decision
                    .cooldown_remaining()
                    .unwrap_or_else(|| self.policy.backoff(attempt));
                info!(
                    "{}. Waiting {:?} before retry {}/{}",
                    reason,
                    delay,
                    attempt + 1,
                    max_retries
                );
                let record = CallAttempt {
                    index: attempt,
                    delay: Some(delay),
                    outcome: AttemptOutcome::Throttled { reason },
                };
                record.log(model);
                attempts.push(record);

                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            match operation().await {
                Ok(value) => {
                    let record = CallAttempt {
                        index: attempt,
                        delay: None,
                        outcome: AttemptOutcome::Succeeded,
                    };
                    record.log(model);
                    attempts.push(record);
                    return (Ok(value), attempts);
                }
                Err(err) => match err.classify() {
                    FailureKind::RateLimited { retry_after } if attempt < max_retries => {
                        let delay = retry_after
                            .unwrap_or_else(|| self.policy.backoff(attempt))
                            .min(MAX_COOLDOWN_PERIOD);
                        warn!(
                            "Rate limit hit (429) for {}. Waiting {:?} before retry {}/{}",
                            model,
                            delay,
                            attempt + 1,
                            max_retries
                        );
                        self.tracker.set_cooldown(model, delay).await;

                        let record = CallAttempt {
                            index: attempt,
                            delay: Some(delay),
                            outcome: AttemptOutcome::Rejected { retry_after },
                        };
                        record.log(model);
                        attempts.push(record);

                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    _ => {
                        error!("API call error for {}: {}", model, err);
                        let record = CallAttempt {
                            index: attempt,
                            delay: None,
                            outcome: AttemptOutcome::Failed,
                        };
                        record.log(model);
                        attempts.push(record);
                        return (Err(ExecutorError::Remote(err)), attempts);
                    }
                },
            }
        }
    }
}
