//! Backoff delays and retry policies.

use std::time::Duration;

use rand::Rng;

use crate::config::schema::RetryConfig;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// How often, and how far apart, to retry an operation.
///
/// A policy whose base and max delay are equal is constant: every retry
/// waits exactly that long, with no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    base_ms: u64,
    max_ms: u64,
}

impl RetryPolicy {
    /// Constant delay, never giving up.
    pub fn constant(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            max_attempts: None,
            base_ms: ms,
            max_ms: ms,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether attempt number `attempt` (1-based) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    /// Delay to wait after failed attempt number `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.base_ms >= self.max_ms {
            return Duration::from_millis(self.max_ms);
        }
        calculate_backoff(attempt, self.base_ms, self.max_ms)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
        }
    }
}
