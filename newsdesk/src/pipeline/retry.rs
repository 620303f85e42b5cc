//! Retry policy applied around every collaborator call.
//!
//! A call is retried when the collaborator flags the failure as retryable
//! and its [`ErrorKind`] is in the policy's retryable set. Waits follow an
//! explicit back-off sequence; the last entry is reused once attempts run
//! past the end of it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::errors::{CollaboratorError, ErrorKind};

/// Shape used to generate a back-off sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter applied to each wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JitterStrategy {
    /// Wait exactly the scheduled delay.
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Retry configuration shared by the summarize, draft and publish calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts including the first one. Never below 1.
    pub max_attempts: u32,
    /// Waits before the 2nd, 3rd, ... attempt, in milliseconds.
    pub backoff_ms: Vec<u64>,
    /// Failure kinds that may be retried.
    pub retryable_kinds: HashSet<ErrorKind>,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: vec![1000, 5000, 15000],
            retryable_kinds: ErrorKind::DEFAULT_RETRYABLE.into_iter().collect(),
            jitter: JitterStrategy::None,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts, clamped to at least one.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets an explicit back-off sequence.
    #[must_use]
    pub fn with_backoff_ms(mut self, backoff_ms: impl Into<Vec<u64>>) -> Self {
        self.backoff_ms = backoff_ms.into();
        self
    }

    /// Generates one wait per retry from a strategy, capped at `max_delay_ms`.
    #[must_use]
    pub fn with_backoff_strategy(
        mut self,
        strategy: BackoffStrategy,
        base_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Self {
        let retries = self.max_attempts.saturating_sub(1);
        self.backoff_ms = (0..retries)
            .map(|attempt| {
                let delay = match strategy {
                    BackoffStrategy::Exponential => {
                        base_delay_ms.saturating_mul(2u64.saturating_pow(attempt))
                    }
                    BackoffStrategy::Linear => {
                        base_delay_ms.saturating_mul(u64::from(attempt) + 1)
                    }
                    BackoffStrategy::Constant => base_delay_ms,
                };
                delay.min(max_delay_ms)
            })
            .collect();
        self
    }

    /// Replaces the retryable kinds.
    #[must_use]
    pub fn with_retryable_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable_kinds = kinds.into_iter().collect();
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns true if the policy allows retrying `error`.
    #[must_use]
    pub fn is_retryable(&self, error: &CollaboratorError) -> bool {
        error.is_retryable() && self.retryable_kinds.contains(&error.kind())
    }

    /// Scheduled wait (before jitter) after the `retry`-th failure, 0-indexed.
    #[must_use]
    pub fn scheduled_delay(&self, retry: usize) -> Duration {
        let ms = self
            .backoff_ms
            .get(retry)
            .or_else(|| self.backoff_ms.last())
            .copied()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }

    /// Wait after the `retry`-th failure with jitter applied.
    #[must_use]
    pub fn delay_for(&self, retry: usize) -> Duration {
        let delay = u64::try_from(self.scheduled_delay(retry).as_millis()).unwrap_or(u64::MAX);
        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };
        Duration::from_millis(jittered)
    }
}

/// Result of a retried call together with the attempts it consumed.
#[derive(Debug)]
pub struct Attempted<T> {
    /// Final result.
    pub result: Result<T, CollaboratorError>,
    /// Attempts made, at least one.
    pub attempts: u32,
}

/// Runs `operation` under `policy`, bounding every attempt by `call_timeout`.
///
/// The closure receives the 1-based attempt number. Never returns more than
/// `policy.max_attempts` attempts; a non-retryable failure stops immediately.
/// Cancellation is only observed while waiting between attempts.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    call_timeout: Duration,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        let result = match tokio::time::timeout(call_timeout, operation(attempts)).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                elapsed_ms: u64::try_from(call_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        let error = match result {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts,
                }
            }
            Err(error) => error,
        };

        if !policy.is_retryable(&error) {
            debug!(call = label, attempts, error = %error, "Not retrying");
            return Attempted {
                result: Err(error),
                attempts,
            };
        }

        if attempts >= max_attempts {
            warn!(call = label, attempts, error = %error, "Retries exhausted");
            return Attempted {
                result: Err(error),
                attempts,
            };
        }

        let delay = policy.delay_for(attempts as usize - 1);
        debug!(
            call = label,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying after error"
        );

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => {
                return Attempted {
                    result: Err(CollaboratorError::Cancelled {
                        reason: cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                    }),
                    attempts,
                };
            }
        }
    }
}
