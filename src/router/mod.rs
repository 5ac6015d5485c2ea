//! Bucket routing (component D).
//!
//! Matches a request's host and path against an ordered route table and
//! resolves the bucket handle plus object key to fetch from it.

use crate::error::GatewayError;

/// One entry in the route table. The first route whose host pattern and
/// path prefix both match wins; routes are scanned in table order.
#[derive(Debug, Clone)]
pub struct BucketRoute {
    /// `*` matches any host; `*.suffix` matches any host ending in
    /// `.suffix` (and strictly longer than it); anything else must match
    /// exactly.
    pub host_pattern: String,
    pub path_prefix: String,
    pub bucket_identifier: String,
    pub bucket_display_name: String,
    /// When set and `path_prefix` isn't just `/`, the prefix is removed
    /// from the resolved object key.
    pub strip_prefix: bool,
}

impl BucketRoute {
    fn host_matches(&self, host: &str) -> bool {
        if self.host_pattern == "*" {
            return true;
        }
        if let Some(suffix) = self.host_pattern.strip_prefix("*.") {
            return host.len() > suffix.len() + 1 && host.ends_with(suffix) && host.ends_with(&format!(".{}", suffix));
        }
        self.host_pattern == host
    }

    fn path_matches(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix)
    }
}

/// Result of a successful route resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub bucket_identifier: String,
    pub bucket_display_name: String,
    pub key: String,
}

/// Ordered bucket route table plus a fallback bucket.
pub struct Router {
    routes: Vec<BucketRoute>,
    default_bucket: Option<(String, String)>,
}

impl Router {
    pub fn new(routes: Vec<BucketRoute>, default_bucket: Option<(String, String)>) -> Self {
        Router { routes, default_bucket }
    }

    /// Resolve `(host, path)` into a bucket and object key.
    ///
    /// The object key is the request path with its leading `/` removed;
    /// if the winning route strips its prefix (and that prefix isn't
    /// just `/`), the prefix is removed from the key as well.
    pub fn resolve(&self, host: &str, path: &str) -> Result<Resolved, GatewayError> {
        for route in &self.routes {
            if route.host_matches(host) && route.path_matches(path) {
                let mut key = path.strip_prefix('/').unwrap_or(path).to_string();
                if route.strip_prefix && route.path_prefix != "/" {
                    let stripped_prefix = route.path_prefix.strip_prefix('/').unwrap_or(&route.path_prefix);
                    if let Some(rest) = key.strip_prefix(stripped_prefix) {
                        key = rest.strip_prefix('/').unwrap_or(rest).to_string();
                    }
                }
                return Ok(Resolved {
                    bucket_identifier: route.bucket_identifier.clone(),
                    bucket_display_name: route.bucket_display_name.clone(),
                    key,
                });
            }
        }

        if let Some((identifier, display_name)) = &self.default_bucket {
            let key = path.strip_prefix('/').unwrap_or(path).to_string();
            return Ok(Resolved {
                bucket_identifier: identifier.clone(),
                bucket_display_name: display_name.clone(),
                key,
            });
        }

        Err(GatewayError::Configuration(format!(
            "no bucket route matches host={} path={} and no default bucket is configured",
            host, path
        )))
    }
}
