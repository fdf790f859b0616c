//! Exponential backoff used for request retries and action polling.

use std::time::Duration;

/// Exponential backoff: `min(cap, base * multiplier^retries)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Interval before the first retry.
    pub base: Duration,
    /// Growth factor applied per retry.
    pub multiplier: u32,
    /// Upper bound for a single interval.
    pub cap: Duration,
}

impl Backoff {
    /// Create a new backoff.
    #[must_use]
    pub const fn new(base: Duration, multiplier: u32, cap: Duration) -> Self {
        Self {
            base,
            multiplier,
            cap,
        }
    }

    /// Backoff for polling actions. 25 polls wait a bit more than 117 seconds.
    #[must_use]
    pub const fn poll() -> Self {
        Self::new(Duration::from_secs(1), 2, Duration::from_secs(5))
    }

    /// Backoff for retrying failed requests.
    #[must_use]
    pub const fn retry() -> Self {
        Self::new(Duration::from_secs(1), 2, Duration::from_secs(60))
    }

    /// Interval to wait before retry number `retries` (starting at 0).
    #[must_use]
    pub fn interval(&self, retries: u32) -> Duration {
        self.multiplier
            .checked_pow(retries)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |interval| interval.min(self.cap))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::poll()
    }
}
