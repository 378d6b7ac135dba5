//! Retry decisions for failed gateway calls.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// What happens after a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureOutcome {
    /// Back to the start state; `attempt` is the retry number (1-based) and
    /// `retry_after` how long the caller should wait before re-processing.
    Retrying { attempt: u32, retry_after: Duration },
    /// Retries are used up and the aggregate is now `Failed`.
    Exhausted,
}

impl FailureOutcome {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, FailureOutcome::Exhausted)
    }
}

/// Bounded exponential backoff.
///
/// A failure is retryable while fewer than `max_retries` retries have been
/// made. The delay before retry `n` is `base_delay * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides the outcome of a failure given the retries already made.
    pub fn decide(&self, retries_so_far: u32) -> FailureOutcome {
        if retries_so_far < self.max_retries {
            let attempt = retries_so_far + 1;
            FailureOutcome::Retrying {
                attempt,
                retry_after: self.delay_for(attempt),
            }
        } else {
            FailureOutcome::Exhausted
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

/// Wall-clock time `retry_after` from `now`, clamped to the latest
/// representable instant.
pub(crate) fn retry_at(now: DateTime<Utc>, retry_after: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(retry_after)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
