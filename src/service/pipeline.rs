//! The read-path state machine: INIT → CACHE_PROBE → SLOW_PROBE →
//! ORIGIN_FETCH → ORIGIN_DISPATCH → POPULATE → DONE.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::StreamExt;
use tracing::{debug, warn};

use crate::cache::fast::{EdgeCache, FastLookup};
use crate::cache::kv::key::format_base_key;
use crate::cache::kv::metadata::PreservedHeaders;
use crate::cache::kv::{read as kv_read, KvStore, ReadMeta, ReadOutcome, WriteHeaders};
use crate::config::cache_policy::CachePolicyConfig;
use crate::content_type::{classify_key, classify_mime};
use crate::headers::{build_headers, HeaderList, ObjectMeta};
use crate::metrics::Metrics;
use crate::origin::{FetchOptions, FetchResult, OriginClient, OriginObject};

use super::populate::{fits_fast_tier, populate_fast, populate_slow};
use super::{RequestContext, ResponseBody, ServiceResponse};

const BASE_KEY_PREFIX: &str = "gw";

pub struct ObjectService {
    edge: Arc<EdgeCache>,
    kv: Option<Arc<dyn KvStore>>,
    cache_policy: CachePolicyConfig,
    metrics: Option<Arc<Metrics>>,
}

impl ObjectService {
    pub fn new(edge: Arc<EdgeCache>, kv: Option<Arc<dyn KvStore>>, cache_policy: CachePolicyConfig, metrics: Option<Arc<Metrics>>) -> Self {
        Self { edge, kv, cache_policy, metrics }
    }

    pub async fn handle(&self, ctx: RequestContext, origin: Arc<OriginClient>) -> ServiceResponse {
        let response = self.handle_inner(&ctx, &origin).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_status(response.status);
        }
        response
    }

    async fn handle_inner(&self, ctx: &RequestContext, origin: &Arc<OriginClient>) -> ServiceResponse {
        let cache_url = format!("{}/{}", ctx.host, ctx.key);

        // CACHE_PROBE
        if !ctx.bypass {
            match self.edge.get(&cache_url, ctx.range.as_deref(), ctx.if_none_match.as_deref()).await {
                FastLookup::Full { headers, body } => {
                    self.record_tier_hit("fast");
                    return ServiceResponse { status: 200, headers, body: Self::body_for(ctx, vec![body]) };
                }
                FastLookup::Partial { headers, body, start, end, total } => {
                    self.record_tier_hit("fast");
                    let mut headers = headers;
                    headers.retain(|(k, _)| k != "Content-Length");
                    headers.push(("Content-Range".to_string(), format!("bytes {}-{}/{}", start, end, total)));
                    headers.push(("Content-Length".to_string(), (end - start + 1).to_string()));
                    return ServiceResponse { status: 206, headers, body: Self::body_for(ctx, vec![body]) };
                }
                FastLookup::NotModified { etag } => {
                    return ServiceResponse {
                        status: 304,
                        headers: vec![("ETag".to_string(), etag)],
                        body: ResponseBody::Empty,
                    };
                }
                FastLookup::Miss => {}
            }
        }

        // SLOW_PROBE
        let base_key = format_base_key(BASE_KEY_PREFIX, &ctx.bucket_identifier, &ctx.key);
        if !ctx.bypass {
            if let Some(kv) = &self.kv {
                match kv_read(kv.as_ref(), &base_key, ctx.range.as_deref()).await {
                    ReadOutcome::Full { meta, body } => {
                        self.record_tier_hit("slow");
                        let headers = kv_headers(&meta, meta.total_size);
                        return ServiceResponse { status: 200, headers, body: Self::body_for(ctx, body) };
                    }
                    ReadOutcome::Partial { meta, range, body } => {
                        self.record_tier_hit("slow");
                        let mut headers = kv_headers(&meta, range.end - range.start + 1);
                        headers.push(("Content-Range".to_string(), format!("bytes {}-{}/{}", range.start, range.end, meta.total_size)));
                        return ServiceResponse { status: 206, headers, body: Self::body_for(ctx, body) };
                    }
                    ReadOutcome::Miss => {}
                }
            }
        }

        // ORIGIN_FETCH
        let opts = FetchOptions {
            range: ctx.range.clone(),
            if_none_match: ctx.if_none_match.clone(),
            head_only: ctx.is_head,
        };
        match origin.fetch(&ctx.key, &opts).await {
            FetchResult::NotFound => ServiceResponse::text(404, "Not Found"),
            FetchResult::Error(msg) => {
                warn!(bucket = %ctx.bucket_identifier, key = %ctx.key, error = %msg, "origin fetch failed");
                ServiceResponse::text(502, "Bad Gateway")
            }
            FetchResult::NotModified { etag } => ServiceResponse {
                status: 304,
                headers: vec![("ETag".to_string(), etag)],
                body: ResponseBody::Empty,
            },
            FetchResult::Body(obj) => self.dispatch(ctx, origin, obj).await,
        }
    }

    async fn dispatch(&self, ctx: &RequestContext, origin: &Arc<OriginClient>, obj: OriginObject) -> ServiceResponse {
        let effective_content_type = obj
            .http_metadata
            .content_type
            .clone()
            .or_else(|| obj.content_type.clone())
            .unwrap_or_else(|| classify_key(&ctx.key).to_string());
        let category = classify_mime(&effective_content_type);

        let meta = ObjectMeta {
            etag: obj.etag.clone(),
            size: obj.size,
            content_type: obj.content_type.clone(),
            http_metadata: obj.http_metadata.clone(),
            category,
        };
        let policy = self.cache_policy.policy_for_category(category.as_str());

        let content_length = obj.range.map(|r| r.length).unwrap_or(obj.size);
        let mut headers = build_headers(&meta, &ctx.host, &ctx.key, content_length, &policy, ctx.bypass, &ctx.custom_tags);
        headers.push(("X-Fetch-Via".to_string(), "origin-binding".to_string()));

        if let Some(range) = obj.range {
            headers.push((
                "Content-Range".to_string(),
                format!("bytes {}-{}/{}", range.offset, range.offset + range.length - 1, range.total_size),
            ));
            self.spawn_full_repopulate(ctx.clone(), origin.clone());

            let body = obj.body.map(adapt_byte_stream);
            return ServiceResponse {
                status: 206,
                headers,
                body: body.map(ResponseBody::Streamed).unwrap_or(ResponseBody::Empty),
            };
        }

        if ctx.bypass || ctx.is_head {
            let body = if ctx.is_head { None } else { obj.body };
            return ServiceResponse {
                status: 200,
                headers,
                body: body.map(adapt_byte_stream).map(ResponseBody::Streamed).unwrap_or(ResponseBody::Empty),
            };
        }

        let Some(origin_body) = obj.body else {
            return ServiceResponse { status: 200, headers, body: ResponseBody::Empty };
        };
        let source = adapt_byte_stream(origin_body);

        let cache_url = format!("{}/{}", ctx.host, ctx.key);
        let client_stream = if fits_fast_tier(obj.size) {
            populate_fast(
                self.edge.clone(),
                cache_url,
                headers.clone(),
                obj.etag.clone(),
                Some(obj.size),
                source,
                self.metrics.clone(),
            )
            .boxed()
        } else if let Some(kv) = &self.kv {
            let base_key = format_base_key(BASE_KEY_PREFIX, &ctx.bucket_identifier, &ctx.key);
            let cache_tag = headers.iter().find(|(k, _)| k == "Cache-Tag").map(|(_, v)| v.clone());
            let write_headers = WriteHeaders {
                content_type: effective_content_type,
                etag: obj.etag.clone(),
                preserved: PreservedHeaders::from_http_metadata(&obj.http_metadata, cache_tag),
            };
            let max_age = policy.max_age();
            populate_slow(kv.clone(), base_key, write_headers, max_age, obj.size, source, self.metrics.clone())
                .boxed()
        } else {
            source.boxed()
        };

        ServiceResponse { status: 200, headers, body: ResponseBody::Streamed(client_stream) }
    }

    /// Registered as its own background task per the ordering guarantee
    /// that a Range miss's full-object repopulate is not cancelled when
    /// the client's own (partial) response completes.
    fn spawn_full_repopulate(&self, ctx: RequestContext, origin: Arc<OriginClient>) {
        let edge = self.edge.clone();
        let kv = self.kv.clone();
        let cache_policy = self.cache_policy.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let opts = FetchOptions::default();
            match origin.fetch(&ctx.key, &opts).await {
                FetchResult::Body(obj) if obj.body.is_some() => {
                    debug!(bucket = %ctx.bucket_identifier, key = %ctx.key, "full-object repopulate after range miss");
                    let effective_content_type = obj
                        .http_metadata
                        .content_type
                        .clone()
                        .or_else(|| obj.content_type.clone())
                        .unwrap_or_else(|| classify_key(&ctx.key).to_string());
                    let category = classify_mime(&effective_content_type);
                    let policy = cache_policy.policy_for_category(category.as_str());
                    let meta = ObjectMeta {
                        etag: obj.etag.clone(),
                        size: obj.size,
                        content_type: obj.content_type.clone(),
                        http_metadata: obj.http_metadata.clone(),
                        category,
                    };
                    let headers = build_headers(&meta, &ctx.host, &ctx.key, obj.size, &policy, false, &[]);
                    let source = adapt_byte_stream(obj.body.unwrap());
                    let cache_url = format!("{}/{}", ctx.host, ctx.key);

                    if fits_fast_tier(obj.size) {
                        let mut drain = populate_fast(
                            edge,
                            cache_url,
                            headers,
                            obj.etag.clone(),
                            Some(obj.size),
                            source,
                            metrics,
                        );
                        while drain.next().await.is_some() {}
                    } else if let Some(kv) = kv {
                        let base_key = format_base_key(BASE_KEY_PREFIX, &ctx.bucket_identifier, &ctx.key);
                        let cache_tag = headers_find(&headers, "Cache-Tag");
                        let write_headers = WriteHeaders {
                            content_type: effective_content_type,
                            etag: obj.etag.clone(),
                            preserved: PreservedHeaders::from_http_metadata(&obj.http_metadata, cache_tag),
                        };
                        let mut drain =
                            populate_slow(kv, base_key, write_headers, policy.max_age(), obj.size, source, metrics);
                        while drain.next().await.is_some() {}
                    }
                }
                _ => {}
            }
        });
    }

    fn record_tier_hit(&self, tier: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_tier_hit(tier);
        }
    }

    fn body_for(ctx: &RequestContext, chunks: Vec<Bytes>) -> ResponseBody {
        if ctx.is_head { ResponseBody::Empty } else { ResponseBody::Buffered(chunks) }
    }
}

fn headers_find(headers: &HeaderList, name: &str) -> Option<String> {
    headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

fn kv_headers(meta: &ReadMeta, content_length: u64) -> HeaderList {
    let mut headers = vec![
        ("Content-Type".to_string(), meta.content_type.clone()),
        ("Content-Length".to_string(), content_length.to_string()),
        ("ETag".to_string(), meta.etag.clone()),
        ("Accept-Ranges".to_string(), "bytes".to_string()),
        ("X-Content-Type-Options".to_string(), "nosniff".to_string()),
        ("X-KV-Cache-Status".to_string(), "HIT".to_string()),
    ];

    let p = &meta.preserved;
    if let Some(v) = &p.cache_control {
        headers.push(("Cache-Control".to_string(), v.clone()));
    }
    if let Some(v) = &p.cache_tag {
        headers.push(("Cache-Tag".to_string(), v.clone()));
    }
    if let Some(v) = &p.last_modified {
        headers.push(("Last-Modified".to_string(), v.clone()));
    }
    if let Some(v) = &p.content_disposition {
        headers.push(("Content-Disposition".to_string(), v.clone()));
    }
    if let Some(v) = &p.content_encoding {
        headers.push(("Content-Encoding".to_string(), v.clone()));
    }
    if let Some(v) = &p.content_language {
        headers.push(("Content-Language".to_string(), v.clone()));
    }
    headers
}

fn adapt_byte_stream(body: aws_sdk_s3::primitives::ByteStream) -> futures::stream::BoxStream<'static, Result<Bytes, String>> {
    body.map(|r| r.map_err(|e| e.to_string())).boxed()
}
