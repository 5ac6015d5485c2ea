//! Configuration loading: YAML with `${VAR}` environment substitution.

pub mod bucket;
pub mod cache_policy;
pub mod route;
pub mod storage;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::router::{BucketRoute, Router};

pub use bucket::{BucketConfig, S3Config};
pub use cache_policy::{CachePolicyConfig, ObjectTypeConfig, TagsConfig};
pub use route::RouteConfig;
pub use storage::StorageConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CachePolicyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub buckets: Vec<BucketConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub default_bucket: Option<String>,
}

impl Config {
    /// Load a YAML document, substituting `${VAR_NAME}` references with
    /// environment variables before parsing.
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name)
                .map_err(|_| format!("environment variable '{}' is referenced but not set", var_name))?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    /// Validate the bucket/route surface: no duplicate bucket names, every
    /// route and the default bucket reference a declared bucket.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for bucket in &self.buckets {
            if !seen.insert(&bucket.name) {
                return Err(format!("duplicate bucket name '{}'", bucket.name));
            }
        }

        for route in &self.routes {
            if !self.buckets.iter().any(|b| b.name == route.bucket) {
                return Err(format!("route references undeclared bucket '{}'", route.bucket));
            }
        }

        if let Some(default) = &self.default_bucket {
            if !self.buckets.iter().any(|b| b.name == *default) {
                return Err(format!("default_bucket '{}' is not a declared bucket", default));
            }
        }

        Ok(())
    }

    /// Build the runtime [`Router`] from the route table and default
    /// bucket. Assumes `validate` has already succeeded.
    pub fn build_router(&self) -> Result<Router, String> {
        let routes: Result<Vec<BucketRoute>, String> =
            self.routes.iter().map(|r| r.to_bucket_route(&self.buckets)).collect();

        let default_bucket = match &self.default_bucket {
            Some(name) => {
                let bucket = self
                    .buckets
                    .iter()
                    .find(|b| b.name == *name)
                    .ok_or_else(|| format!("default_bucket '{}' is not a declared bucket", name))?;
                Some((bucket.name.clone(), bucket.display_name().to_string()))
            }
            None => None,
        };

        Ok(Router::new(routes?, default_bucket))
    }

    /// Find the S3 backend configuration bound to a resolved bucket
    /// identifier.
    pub fn bucket_s3_config(&self, bucket_identifier: &str) -> Option<&S3Config> {
        self.buckets.iter().find(|b| b.name == bucket_identifier).map(|b| &b.s3)
    }
}
