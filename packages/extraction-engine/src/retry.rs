//! Retry controller with exponential backoff, jitter and a wall-clock
//! deadline.
//!
//! Wraps a single fallible provider call. Only errors classified retryable
//! by [`ExtractionError::is_retryable`] are retried; everything else
//! propagates on first occurrence.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::types::config::ProviderConfig;

/// Retry behavior knobs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each retry after
    pub base_delay: Duration,

    /// Upper bound on any single backoff delay
    pub max_delay: Duration,

    /// Jitter fraction: each delay gains a uniform random `[0, jitter]`
    /// share of itself
    pub jitter: f64,

    /// Wall-clock bound on attempts plus backoff; no retry is scheduled
    /// past it
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: 0.25,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and base delay.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Derive the policy from a provider configuration.
    ///
    /// The deadline is `timeout * max_attempts`: a slow provider can never
    /// exceed the caller-visible worst case even with backoff stacked on
    /// top.
    pub fn from_provider(config: &ProviderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_backoff,
            deadline: Some(config.timeout.saturating_mul(config.max_attempts.max(1))),
            ..Self::default()
        }
    }

    /// Cap single backoff delays.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the jitter fraction (0.0 disables jitter).
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Set the overall wall-clock deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Un-jittered backoff delay after `completed_attempts` failures:
    /// `base_delay * 2^(n-1)`, capped at `max_delay`.
    ///
    /// Monotonically non-decreasing in `completed_attempts`.
    pub fn delay_for(&self, completed_attempts: u32) -> Duration {
        if completed_attempts == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(completed_attempts - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.0..=self.jitter);
        delay + delay.mul_f64(factor)
    }
}

/// Attempt accounting for one `execute` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Attempts made (successful attempt included)
    pub attempts: u32,

    /// Cumulative time spent sleeping between attempts
    pub backoff: Duration,
}

/// Executes one fallible operation under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    /// Create a controller for the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds, fails non-retryably, or the
    /// attempt/deadline budget runs out.
    ///
    /// The operation receives the 1-based attempt number. Cancellation via
    /// `cancel` abandons in-flight work and schedules no further attempts.
    /// Stats are returned alongside the outcome so failures keep their
    /// attempt accounting.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> (Result<T>, RetryStats)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut stats = RetryStats::default();

        loop {
            if cancel.is_cancelled() {
                return (Err(ExtractionError::Cancelled), stats);
            }

            stats.attempts += 1;
            let attempt = stats.attempts;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ExtractionError::Cancelled),
                outcome = operation(attempt) => outcome,
            };

            let error = match outcome {
                Ok(value) => return (Ok(value), stats),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.policy.max_attempts {
                if error.is_retryable() {
                    warn!(attempts = attempt, error = %error, "retry budget exhausted");
                }
                return (Err(error), stats);
            }

            let delay = self.policy.jittered(self.policy.delay_for(attempt));

            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() + delay >= deadline {
                    warn!(
                        attempts = attempt,
                        error = %error,
                        "retry deadline reached before next attempt"
                    );
                    return (Err(error), stats);
                }
            }

            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after backoff"
            );
            stats.backoff += delay;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return (Err(ExtractionError::Cancelled), stats),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
