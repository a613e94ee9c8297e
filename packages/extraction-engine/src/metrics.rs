//! Performance instrumentation for extraction calls.
//!
//! Each call produces a request-scoped [`PerformanceSample`]; the shared
//! [`PerformanceMonitor`] folds completed samples into atomic aggregate
//! counters so concurrent completions never lose updates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use uuid::Uuid;

/// Token usage reported by a provider's `usage` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    /// Input tokens consumed
    pub prompt_tokens: u32,

    /// Output tokens generated
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used by the call.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Per-call performance metadata.
///
/// Created at the start of an extraction, filled in as the pipeline runs,
/// and attached to the result (or to the failure report).
#[derive(Debug, Clone)]
pub struct PerformanceSample {
    /// Request id for log correlation
    pub request_id: Uuid,

    /// Provider that served (or failed) the call, once resolved
    pub provider: String,

    /// Total wall-clock time for the call
    pub elapsed: Duration,

    /// Provider call attempts made
    pub attempts: u32,

    /// Cumulative time spent sleeping between attempts
    pub backoff: Duration,

    /// Content size (chars) before preprocessing
    pub content_chars_before: usize,

    /// Content size (chars) after cleaning and bounding
    pub content_chars_after: usize,

    /// Estimated prompt tokens for the bounded content
    pub estimated_prompt_tokens: usize,

    /// Exact usage when the provider reported it
    pub reported_usage: Option<TokenUsage>,
}

impl PerformanceSample {
    /// Create an empty sample with a fresh request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            provider: String::new(),
            elapsed: Duration::ZERO,
            attempts: 0,
            backoff: Duration::ZERO,
            content_chars_before: 0,
            content_chars_after: 0,
            estimated_prompt_tokens: 0,
            reported_usage: None,
        }
    }
}

impl Default for PerformanceSample {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate counters across all extraction calls.
///
/// Shared between concurrent strategies via `Arc`; all updates are atomic.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    calls: AtomicU64,
    failures: AtomicU64,
    attempts: AtomicU64,
    backoff_ms: AtomicU64,
    elapsed_ms: AtomicU64,
    prompt_tokens: AtomicU64,
}

impl PerformanceMonitor {
    /// Create a monitor with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a completed sample into the aggregates.
    pub fn record(&self, sample: &PerformanceSample, success: bool) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.attempts
            .fetch_add(u64::from(sample.attempts), Ordering::Relaxed);
        self.backoff_ms
            .fetch_add(sample.backoff.as_millis() as u64, Ordering::Relaxed);
        self.elapsed_ms
            .fetch_add(sample.elapsed.as_millis() as u64, Ordering::Relaxed);
        let tokens = sample
            .reported_usage
            .map(|u| u64::from(u.prompt_tokens))
            .unwrap_or(sample.estimated_prompt_tokens as u64);
        self.prompt_tokens.fetch_add(tokens, Ordering::Relaxed);
    }

    /// Consistent-enough view of the aggregates for reporting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            backoff: Duration::from_millis(self.backoff_ms.load(Ordering::Relaxed)),
            elapsed: Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed)),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the monitor's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub attempts: u64,
    pub backoff: Duration,
    pub elapsed: Duration,
    pub prompt_tokens: u64,
}

impl MetricsSnapshot {
    /// Mean provider attempts per call (0 when no calls recorded).
    pub fn mean_attempts(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.attempts as f64 / self.calls as f64
        }
    }
}
