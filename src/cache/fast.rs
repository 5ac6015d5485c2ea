//! In-process fast tier (the "edge cache").
//!
//! There is no literal CDN edge in a self-hosted binary, so this module
//! *is* the fast tier: it stores whole 200 responses and synthesizes 206
//! and 304 itself on lookup, the way a real edge cache would transparently
//! do for its origin.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::notification::RemovalCause;

use crate::range::parse_range;

/// A complete cached response: the full body plus the exact header set
/// that was built for it at populate time.
#[derive(Debug, Clone)]
pub struct FastCacheEntry {
    pub body: bytes::Bytes,
    pub etag: String,
    pub headers: Vec<(String, String)>,
}

impl FastCacheEntry {
    fn size_bytes(&self) -> usize {
        self.body.len()
    }
}

/// Outcome of a fast-tier lookup, already reconstructed into the shape
/// the caller can hand straight to the client.
pub enum FastLookup {
    Miss,
    NotModified { etag: String },
    Full { headers: Vec<(String, String)>, body: bytes::Bytes },
    Partial { headers: Vec<(String, String)>, body: bytes::Bytes, start: u64, end: u64, total: u64 },
}

pub struct EdgeCache {
    cache: Cache<String, Arc<FastCacheEntry>>,
}

impl EdgeCache {
    /// `max_total_bytes` bounds the aggregate weight of all entries;
    /// `default_ttl_secs` is the cache-wide time-to-live (the fast tier
    /// does not track a distinct TTL per entry).
    pub fn new(max_total_bytes: u64, default_ttl_secs: u64, evictions: Arc<std::sync::atomic::AtomicU64>) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_total_bytes)
            .time_to_live(Duration::from_secs(default_ttl_secs))
            .weigher(|_key, entry: &Arc<FastCacheEntry>| {
                let size = entry.size_bytes();
                size.min(u32::MAX as usize) as u32
            })
            .eviction_listener(move |_key, _value, cause| {
                if matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    evictions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            })
            .build();
        Self { cache }
    }

    /// Only a body with a known, exact `Content-Length` may be put; the
    /// caller is responsible for skipping the put when the origin declined
    /// to supply one.
    pub async fn put(&self, url_key: String, entry: FastCacheEntry) {
        self.cache.insert(url_key, Arc::new(entry)).await;
    }

    pub async fn invalidate(&self, url_key: &str) {
        self.cache.invalidate(url_key).await;
    }

    /// Look up `url_key`, synthesizing 304 (when `if_none_match` matches)
    /// or 206 (when `range` is present and satisfiable) from the stored
    /// full response.
    pub async fn get(&self, url_key: &str, range: Option<&str>, if_none_match: Option<&str>) -> FastLookup {
        let Some(entry) = self.cache.get(url_key).await else {
            return FastLookup::Miss;
        };

        if let Some(candidate) = if_none_match {
            if etag_matches(candidate, &entry.etag) {
                return FastLookup::NotModified { etag: entry.etag.clone() };
            }
        }

        if let Some(range_header) = range {
            if let Ok(parsed) = parse_range(range_header, entry.body.len() as u64) {
                let slice = entry.body.slice(parsed.start as usize..=parsed.end as usize);
                return FastLookup::Partial {
                    headers: entry.headers.clone(),
                    body: slice,
                    start: parsed.start,
                    end: parsed.end,
                    total: entry.body.len() as u64,
                };
            }
        }

        FastLookup::Full { headers: entry.headers.clone(), body: entry.body.clone() }
    }
}

/// `If-None-Match` may carry a comma-separated list or `*`; any exact
/// match (including the weak-comparison wildcard) counts as a hit.
fn etag_matches(if_none_match: &str, stored_etag: &str) -> bool {
    if if_none_match.trim() == "*" {
        return true;
    }
    if_none_match.split(',').any(|candidate| candidate.trim() == stored_etag)
}
