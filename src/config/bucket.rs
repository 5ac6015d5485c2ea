//! Bucket and S3 configuration.
//!
//! Auth, authorization, IP filtering, circuit breakers, per-bucket rate
//! limits, and HA replica sets are out of scope here; a bucket is just a
//! name bound to one S3-compatible backend.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ORIGIN_TIMEOUT_SECS;

fn default_timeout() -> u64 {
    DEFAULT_ORIGIN_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub s3: S3Config,
}

impl BucketConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3Config {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}
