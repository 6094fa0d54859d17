//! # Retry Backoff
//!
//! Per-key retry delays for the change queue. The delay depends only on how
//! many consecutive times the key has failed, so the policy is stateless and
//! shared by every key of a queue.
//!
//! Default sequence: 5ms, 10ms, 20ms, 40ms, ... capped at 1000s.

use std::fmt::Debug;
use std::time::Duration;

/// Computes the delay before a failed key is retried.
pub trait BackoffPolicy: Send + Sync + Debug {
    /// Delay for the `failures`-th consecutive failure (1-based)
    fn backoff(&self, failures: u32) -> Duration;
}

/// Exponential backoff calculator
///
/// `base * 2^(failures - 1)`, capped at `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with the given base delay and cap
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_secs(1000))
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1);
        if exp >= 32 {
            return self.max;
        }
        self.base
            .checked_mul(1u32 << exp)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}
