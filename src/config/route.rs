//! Route-table configuration feeding the bucket router (component D).

use serde::{Deserialize, Serialize};

use crate::router::BucketRoute;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub host_pattern: String,
    pub path_prefix: String,
    pub bucket: String,
    #[serde(default)]
    pub strip_prefix: bool,
}

impl RouteConfig {
    /// Resolve against `buckets` to build the runtime [`BucketRoute`],
    /// failing if `bucket` names an undeclared bucket.
    pub fn to_bucket_route(&self, buckets: &[super::bucket::BucketConfig]) -> Result<BucketRoute, String> {
        let bucket = buckets
            .iter()
            .find(|b| b.name == self.bucket)
            .ok_or_else(|| format!("route references undeclared bucket '{}'", self.bucket))?;

        Ok(BucketRoute {
            host_pattern: self.host_pattern.clone(),
            path_prefix: self.path_prefix.clone(),
            bucket_identifier: bucket.name.clone(),
            bucket_display_name: bucket.display_name().to_string(),
            strip_prefix: self.strip_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::bucket::{BucketConfig, S3Config};

    fn bucket(name: &str) -> BucketConfig {
        BucketConfig { name: name.to_string(), display_name: None, s3: S3Config::default() }
    }

    #[test]
    fn resolves_against_matching_bucket() {
        let route = RouteConfig {
            host_pattern: "*".to_string(),
            path_prefix: "/images".to_string(),
            bucket: "images".to_string(),
            strip_prefix: true,
        };
        let resolved = route.to_bucket_route(&[bucket("images")]).unwrap();
        assert_eq!(resolved.bucket_identifier, "images");
        assert!(resolved.strip_prefix);
    }

    #[test]
    fn errors_on_undeclared_bucket() {
        let route = RouteConfig {
            host_pattern: "*".to_string(),
            path_prefix: "/".to_string(),
            bucket: "missing".to_string(),
            strip_prefix: false,
        };
        assert!(route.to_bucket_route(&[bucket("images")]).is_err());
    }
}
