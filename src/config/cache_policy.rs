//! Cache-policy configuration (YAML format): max-age defaults, per-category
//! overrides, and cache-tag generation settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BYPASS_PARAM_NAME, DEFAULT_MAX_AGE_SECS, DEFAULT_STALE_WHILE_REVALIDATE_SECS, DEFAULT_TAG_PREFIX,
};
use crate::headers::CachePolicy;

fn default_max_age() -> u64 {
    DEFAULT_MAX_AGE_SECS
}

fn default_swr() -> u64 {
    DEFAULT_STALE_WHILE_REVALIDATE_SECS
}

fn default_tag_prefix() -> String {
    DEFAULT_TAG_PREFIX.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObjectTypeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_tag_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub default_tags: Vec<String>,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self { enabled: false, prefix: default_tag_prefix(), default_tags: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicyConfig {
    #[serde(default = "default_max_age")]
    pub default_max_age: u64,
    #[serde(default = "default_swr")]
    pub default_swr: u64,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub bypass_param_enabled: bool,
    #[serde(default)]
    pub bypass_param_name: Option<String>,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub object_type_config: HashMap<String, ObjectTypeConfig>,
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            default_max_age: default_max_age(),
            default_swr: default_swr(),
            cache_enabled: true,
            bypass_param_enabled: true,
            bypass_param_name: None,
            tags: TagsConfig::default(),
            object_type_config: HashMap::new(),
        }
    }
}

impl CachePolicyConfig {
    /// The configured bypass query-parameter name, falling back to the
    /// recommended default when unset.
    pub fn bypass_param_name(&self) -> &str {
        self.bypass_param_name.as_deref().unwrap_or(DEFAULT_BYPASS_PARAM_NAME)
    }

    /// Builds the effective [`CachePolicy`] for a single object category.
    /// Category-specific settings, when present, override the defaults.
    pub fn policy_for_category(&self, category: &str) -> CachePolicy {
        let override_cfg = self.object_type_config.get(category);

        CachePolicy {
            default_max_age_secs: self.default_max_age,
            category_max_age_secs: override_cfg.and_then(|c| c.max_age),
            stale_while_revalidate_secs: self.default_swr,
            tags_enabled: self.tags.enabled,
            tag_prefix: self.tags.prefix.clone(),
            default_tags: self.tags.default_tags.clone(),
            category_tags: override_cfg.map(|c| c.tags.clone()).unwrap_or_default(),
        }
    }
}
