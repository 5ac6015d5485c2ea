//! Origin retry configuration (YAML format).

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};
use crate::retry::RetryPolicy;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_exponential_backoff() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_exponential_backoff")]
    pub exponential_backoff: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            exponential_backoff: default_exponential_backoff(),
        }
    }
}

impl StorageConfig {
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
            exponential_backoff: self.exponential_backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config: StorageConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.retry_delay_ms, DEFAULT_RETRY_DELAY_MS);
        assert!(config.exponential_backoff);
    }

    #[test]
    fn converts_to_retry_policy() {
        let config = StorageConfig { max_retries: 5, retry_delay_ms: 200, exponential_backoff: false };
        let policy = config.to_retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.retry_delay_ms, 200);
        assert!(!policy.exponential_backoff);
    }
}
