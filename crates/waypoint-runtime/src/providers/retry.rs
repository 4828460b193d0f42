//! Per-provider retry policy.

use backon::ExponentialBuilder;
use std::time::Duration;

/// Growth factor between successive backoff delays.
pub const BACKOFF_FACTOR: f32 = 1.5;

/// How many times a provider tries one model, and how long it waits between
/// tries.
///
/// Delay before retry `n` (0-based) is `base_delay × 1.5^n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total tries per call, including the first. Never below 1.
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single()
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// One try, no retries. The primary family's policy: a failing model is
    /// abandoned for the next one in the cascade.
    pub fn single() -> Self {
        Self::new(1, Duration::from_secs(1))
    }

    /// Backoff schedule for `backon`.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_factor(BACKOFF_FACTOR)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Delay before retry `n` (0-based), for logs and tests.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .mul_f64(f64::from(BACKOFF_FACTOR).powi(retry as i32))
    }
}
