//! Background cache-tier population.
//!
//! Both branches tee the origin bytestream and hand one half to the client
//! while the other half is driven to completion in a detached task,
//! registered with `tokio::spawn` so it outlives the response handshake.
//! The fast tier uses [`super::stream::tee_fused`]: a client disconnect
//! must also cut off the accumulate side so a half-drained body never
//! reaches `edge.put`. The slow tier uses the plain
//! [`super::stream::tee`], since its write should run to completion
//! independent of whether the client is still reading.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures::stream::Stream;
use tracing::warn;

use crate::cache::fast::{EdgeCache, FastCacheEntry};
use crate::cache::kv::{write_stream, KvStore, WriteHeaders};
use crate::constants::FAST_CACHE_CAP_BYTES;
use crate::headers::HeaderList;
use crate::metrics::Metrics;

use super::stream::{tee, tee_fused};

/// Populate the fast tier concurrently with streaming to the client.
/// Used when the object's size is within the fast tier's per-entry cap.
pub fn populate_fast<S, E>(
    edge: Arc<EdgeCache>,
    url_key: String,
    headers: HeaderList,
    etag: String,
    content_length: Option<u64>,
    source: S,
    metrics: Option<Arc<Metrics>>,
) -> impl Stream<Item = Result<Bytes, String>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::fmt::Display,
{
    // Fused: a client disconnect must stop the accumulate side too, so a
    // partial body never reaches `edge.put`.
    let (client_stream, mut accumulate_stream) = tee_fused(source);

    tokio::spawn(async move {
        use futures::StreamExt;

        let started = Instant::now();

        let Some(expected_len) = content_length else {
            // No exact Content-Length; the fast-cache put constraint forbids
            // caching a chunked-transfer body, so just drain the tee side.
            while accumulate_stream.next().await.is_some() {}
            return;
        };

        let mut buf = bytes::BytesMut::with_capacity(expected_len as usize);
        while let Some(frame) = accumulate_stream.next().await {
            match frame {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(err) => {
                    warn!(url_key, error = %err, "fast-cache populate aborted mid-stream");
                    return;
                }
            }
        }

        let body = buf.freeze();
        if body.len() as u64 != expected_len {
            warn!(url_key, expected_len, actual_len = body.len(), "fast-cache populate length mismatch");
            return;
        }

        edge.put(url_key, FastCacheEntry { body, etag, headers }).await;
        if let Some(metrics) = &metrics {
            metrics.observe_populate_duration(started.elapsed().as_secs_f64());
        }
    });

    client_stream
}

/// Populate the slow tier concurrently with streaming to the client. Used
/// when the object exceeds the fast tier's per-entry cap.
pub fn populate_slow<S, E>(
    kv: Arc<dyn KvStore>,
    base_key: String,
    write_headers: WriteHeaders,
    max_age: u64,
    total_size: u64,
    source: S,
    metrics: Option<Arc<Metrics>>,
) -> impl Stream<Item = Result<Bytes, String>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::fmt::Display,
{
    let (client_stream, slow_stream) = tee(source);

    tokio::spawn(async move {
        let started = Instant::now();
        match write_stream(kv.as_ref(), &base_key, slow_stream, total_size, &write_headers, max_age).await {
            Ok(()) => {
                if let Some(metrics) = &metrics {
                    metrics.observe_populate_duration(started.elapsed().as_secs_f64());
                }
            }
            Err(err) => warn!(base_key, error = %err, "slow-tier populate failed"),
        }
    });

    client_stream
}

/// Whether `size` should populate the fast tier (`true`) or the slow tier
/// (`false`) when a slow tier is configured. Callers with no slow tier
/// handle always populate the fast tier regardless of size (objects too
/// big for it simply go uncached.
pub fn fits_fast_tier(size: u64) -> bool {
    size <= FAST_CACHE_CAP_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::kv::store::FakeKvStore;
    use crate::cache::kv::metadata::PreservedHeaders;
    use futures::stream::{iter, StreamExt};
    use std::sync::atomic::AtomicU64;

    fn edge_cache() -> Arc<EdgeCache> {
        Arc::new(EdgeCache::new(10 * 1024 * 1024, 3600, Arc::new(AtomicU64::new(0))))
    }

    #[tokio::test]
    async fn populate_fast_streams_to_client_and_warms_the_cache() {
        let edge = edge_cache();
        let source = iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"hello"))]);

        let client_stream = populate_fast(
            edge.clone(),
            "cdn.example/a.txt".to_string(),
            vec![("Content-Type".to_string(), "text/plain".to_string())],
            "\"etag\"".to_string(),
            Some(5),
            source,
            None,
        );

        let collected: Vec<u8> = client_stream
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flat_map(|b| b.to_vec())
            .collect();
        assert_eq!(collected, b"hello");

        // Give the detached populate task a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        match edge.get("cdn.example/a.txt", None, None).await {
            crate::cache::fast::FastLookup::Full { body, .. } => assert_eq!(body.as_ref(), b"hello"),
            _ => panic!("expected the background populate to have warmed the cache"),
        }
    }

    #[tokio::test]
    async fn populate_fast_observes_populate_duration() {
        let edge = edge_cache();
        let registry = prometheus::Registry::new();
        let metrics = Arc::new(Metrics::new(&registry));
        let source = iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"hello"))]);

        let client_stream = populate_fast(
            edge,
            "cdn.example/b.txt".to_string(),
            vec![],
            "\"etag\"".to_string(),
            Some(5),
            source,
            Some(metrics.clone()),
        );
        let _: Vec<_> = client_stream.collect().await;

        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(metrics.populate_duration_seconds.get_sample_count(), 1);
    }

    #[tokio::test]
    async fn populate_slow_streams_to_client_and_writes_to_kv() {
        let store: Arc<dyn KvStore> = Arc::new(FakeKvStore::new());
        let source = iter(vec![Ok::<_, std::io::Error>(Bytes::from(vec![9u8; 2048]))]);

        let write_headers = WriteHeaders {
            content_type: "application/octet-stream".to_string(),
            etag: "\"e\"".to_string(),
            preserved: PreservedHeaders::default(),
        };

        let client_stream = populate_slow(
            store.clone(),
            "gw:bucket:k".to_string(),
            write_headers,
            3600,
            2048,
            source,
            None,
        );

        let collected: Vec<u8> = client_stream
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flat_map(|b| b.to_vec())
            .collect();
        assert_eq!(collected.len(), 2048);

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(store.get("gw:bucket:k").await.unwrap().is_some());
    }

    #[test]
    fn fits_fast_tier_respects_the_cap() {
        assert!(fits_fast_tier(FAST_CACHE_CAP_BYTES));
        assert!(!fits_fast_tier(FAST_CACHE_CAP_BYTES + 1));
    }
}
