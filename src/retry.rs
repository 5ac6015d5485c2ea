//! Retry policy with exponential backoff for origin fetches.
//!
//! Retries apply to transport failures only; a negative lookup (object
//! absent) is never retried.

use std::time::Duration;

use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay_ms: u64, exponential_backoff: bool) -> Self {
        Self {
            max_retries,
            retry_delay_ms,
            exponential_backoff,
        }
    }

    /// Delay before attempt `attempt` (0-indexed; 0 is the first attempt
    /// and never waits). `attempt` counts retries, so attempt 1 is the
    /// first retry.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }
        let delay_ms = if self.exponential_backoff {
            self.retry_delay_ms.saturating_mul(2u64.saturating_pow(attempt - 1))
        } else {
            self.retry_delay_ms
        };
        Duration::from_millis(delay_ms)
    }

    /// Whether another attempt is allowed after `attempt` (0-indexed)
    /// attempts have already been made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_recommended_constants() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_delay_ms, 100);
        assert!(policy.exponential_backoff);
    }

    #[test]
    fn first_attempt_has_no_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_duration(0), Duration::from_millis(0));
    }

    #[test]
    fn exponential_backoff_doubles_each_attempt() {
        let policy = RetryPolicy::new(5, 100, true);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(3), Duration::from_millis(400));
    }

    #[test]
    fn constant_backoff_stays_flat() {
        let policy = RetryPolicy::new(5, 150, false);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(150));
        assert_eq!(policy.backoff_duration(4), Duration::from_millis(150));
    }

    #[test]
    fn should_retry_stops_at_max_retries() {
        let policy = RetryPolicy::new(3, 100, true);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
