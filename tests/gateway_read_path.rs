//! End-to-end exercises of the read-path state machine against the fast
//! and slow cache tiers, using an unreachable dummy origin client to prove
//! that cache hits never touch the origin at all.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use bytes::Bytes;

use edge_object_gateway::cache::fast::{EdgeCache, FastCacheEntry};
use edge_object_gateway::cache::kv::{write_buffered, KvStore, WriteHeaders};
use edge_object_gateway::cache::kv::metadata::PreservedHeaders;
use edge_object_gateway::cache::kv::store::FakeKvStore;
use edge_object_gateway::config::CachePolicyConfig;
use edge_object_gateway::origin::OriginClient;
use edge_object_gateway::retry::RetryPolicy;
use edge_object_gateway::service::{ObjectService, RequestContext};

/// An `OriginClient` wrapping an `aws_sdk_s3::Client` pointed at a bucket
/// with no network path to it. Valid to construct (no I/O happens until a
/// request is actually sent), useless to call `fetch` on — exactly what a
/// cache-hit test needs: the origin must exist but must never be reached.
fn unreachable_origin() -> Arc<OriginClient> {
    let credentials = Credentials::new("test", "test", None, None, "gateway-test");
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url("http://127.0.0.1:1")
        .build();
    let client = aws_sdk_s3::Client::from_conf(config);
    Arc::new(OriginClient::new(client, "test-bucket".to_string(), RetryPolicy::new(0, 1, false)))
}

fn ctx(key: &str) -> RequestContext {
    RequestContext {
        host: "cdn.example".to_string(),
        bucket_identifier: "images".to_string(),
        key: key.to_string(),
        is_head: false,
        range: None,
        if_none_match: None,
        bypass: false,
        custom_tags: Vec::new(),
    }
}

#[tokio::test]
async fn fast_tier_hit_never_touches_the_origin() {
    let edge = Arc::new(EdgeCache::new(10 * 1024 * 1024, 3600, Arc::new(AtomicU64::new(0))));
    edge.put(
        "cdn.example/photo.jpg".to_string(),
        FastCacheEntry {
            body: Bytes::from_static(b"cached bytes"),
            etag: "\"abc\"".to_string(),
            headers: vec![("Content-Type".to_string(), "image/jpeg".to_string())],
        },
    )
    .await;

    let service = ObjectService::new(edge, None, CachePolicyConfig::default(), None);
    let response = service.handle(ctx("photo.jpg"), unreachable_origin()).await;

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn slow_tier_hit_never_touches_the_origin() {
    let edge = Arc::new(EdgeCache::new(10 * 1024 * 1024, 3600, Arc::new(AtomicU64::new(0))));
    let kv: Arc<dyn KvStore> = Arc::new(FakeKvStore::new());

    let write_headers = WriteHeaders {
        content_type: "text/plain".to_string(),
        etag: "\"slow-etag\"".to_string(),
        preserved: PreservedHeaders::default(),
    };
    write_buffered(kv.as_ref(), "gw:images:notes.txt", Bytes::from_static(b"slow tier bytes"), &write_headers, 3600)
        .await
        .unwrap();

    let service = ObjectService::new(edge, Some(kv), CachePolicyConfig::default(), None);
    let response = service.handle(ctx("notes.txt"), unreachable_origin()).await;

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn bypass_flag_skips_both_cache_tiers_and_reaches_for_the_origin() {
    let edge = Arc::new(EdgeCache::new(10 * 1024 * 1024, 3600, Arc::new(AtomicU64::new(0))));
    edge.put(
        "cdn.example/photo.jpg".to_string(),
        FastCacheEntry {
            body: Bytes::from_static(b"cached bytes"),
            etag: "\"abc\"".to_string(),
            headers: vec![("Content-Type".to_string(), "image/jpeg".to_string())],
        },
    )
    .await;

    let service = ObjectService::new(edge, None, CachePolicyConfig::default(), None);
    let mut request = ctx("photo.jpg");
    request.bypass = true;

    // The dummy origin's endpoint is unroutable, so bypass is expected to
    // surface as a 502 — the point of this test is that it is *attempted*
    // at all, proving the fast-tier hit above was skipped.
    let response = service.handle(request, unreachable_origin()).await;
    assert_eq!(response.status, 502);
}
