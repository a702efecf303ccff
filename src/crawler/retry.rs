use crate::config::TimeoutConfig;
use std::time::Duration;

/// Exponential backoff schedule for one URL
///
/// Attempts are numbered from 0. After a failed attempt `n` the client sleeps
/// `base * 2^n` before attempt `n + 1`; no sleep follows the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per URL
    pub max_retries: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: Duration) -> Self {
        Self { max_retries, base }
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self::new(config.max_retries, config.backoff_base())
    }

    /// Delay slept after failed attempt `attempt`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tidemark::crawler::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(4, Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }

    /// Returns true if another attempt follows attempt `attempt`
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_retries
    }

    /// Every delay the policy would sleep for a URL that never succeeds
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries)
            .filter(|attempt| self.has_next(*attempt))
            .map(|attempt| self.delay_for(attempt))
            .collect()
    }
}
