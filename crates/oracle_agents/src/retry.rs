//! Bounded retry policy for reasoning calls.
//!
//! Provides:
//! - **Per-attempt deadline**: every attempt is wrapped in `tokio::time::timeout`
//! - **Exponential back-off**: `initial × multiplier^(attempt−1)`, capped at `max_backoff`
//! - **Classification**: only retryable [`StageError`]s are retried

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ProviderError, StageError};

/// Explicit retry budget for one stage's model calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first (≥ 1, default: 3).
    pub max_attempts: u32,
    /// Delay before the second attempt (default: 500ms).
    pub initial_backoff: Duration,
    /// Upper bound of any single delay (default: 8s).
    pub max_backoff: Duration,
    /// Back-off multiplier (default: 2.0).
    pub multiplier: f64,
    /// Deadline of one attempt (default: 60s).
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that makes a single attempt.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let delay = self.initial_backoff.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }

    /// Check the policy's invariants, returning a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.attempt_timeout.is_zero() {
            return Err("attempt_timeout must be positive".to_string());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err("multiplier must be a finite number >= 1".to_string());
        }
        if self.initial_backoff > self.max_backoff {
            return Err("initial_backoff must not exceed max_backoff".to_string());
        }
        Ok(())
    }

    /// Run `op` until it succeeds, fails permanently or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// - the first non-retryable error, unchanged
    /// - [`StageError::RetriesExhausted`] carrying the last cause otherwise
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, StageError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last = StageError::malformed("no attempt made");

        for attempt in 1..=attempts {
            debug!(call = label, attempt, "reasoning attempt");
            let outcome = match tokio::time::timeout(self.attempt_timeout, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.attempt_timeout).into()),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    warn!(call = label, attempt, max_attempts = attempts, error = %err, "attempt failed");
                    last = err;
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.backoff_for(attempt)).await;
            }
        }

        Err(StageError::RetriesExhausted {
            attempts,
            last: Box::new(last),
        })
    }
}
