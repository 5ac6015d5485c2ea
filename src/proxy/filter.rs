use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use pingora::prelude::*;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use tracing::warn;

use crate::config::cache_policy::CachePolicyConfig;
use crate::origin::OriginClient;
use crate::router::Router;
use crate::service::{ObjectService, RequestContext, ResponseBody, ServiceResponse};

/// Per-bucket blob-store clients, keyed by bucket identifier, alongside the
/// route table and the shared read-path state machine.
pub struct GatewayProxy {
    router: Arc<Router>,
    service: Arc<ObjectService>,
    origins: HashMap<String, Arc<OriginClient>>,
    cache_enabled: bool,
    bypass_param_enabled: bool,
    bypass_param_name: String,
}

impl GatewayProxy {
    pub fn new(
        router: Arc<Router>,
        service: Arc<ObjectService>,
        origins: HashMap<String, Arc<OriginClient>>,
        cache_policy: &CachePolicyConfig,
    ) -> Self {
        Self {
            router,
            service,
            origins,
            cache_enabled: cache_policy.cache_enabled,
            bypass_param_enabled: cache_policy.bypass_param_enabled,
            bypass_param_name: cache_policy.bypass_param_name().to_string(),
        }
    }

    /// INIT: resolve the route, parse conditional/range headers and the
    /// bypass/tags query parameters, and build the request context the
    /// state machine needs. Returns `Err` with a finished error response
    /// when the request can't even be routed.
    fn build_context(&self, session: &Session) -> Result<(RequestContext, Arc<OriginClient>), ServiceResponse> {
        let req = session.req_header();
        let path = req.uri.path();
        let host = host_header(req).unwrap_or_else(|| "".to_string());

        let resolved = self
            .router
            .resolve(&host, path)
            .map_err(|e| ServiceResponse::text(404, &e.to_string()))?;

        let origin = self
            .origins
            .get(&resolved.bucket_identifier)
            .cloned()
            .ok_or_else(|| ServiceResponse::text(502, "no origin configured for bucket"))?;

        let query = req.uri.query().unwrap_or("");
        let params = parse_query(query);

        let bypass = !self.cache_enabled || (self.bypass_param_enabled && params.contains_key(&self.bypass_param_name));
        let custom_tags = params
            .get("tags")
            .map(|v| v.split(',').map(|s| s.to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let ctx = RequestContext {
            host,
            bucket_identifier: resolved.bucket_identifier,
            key: resolved.key,
            is_head: req.method == http::Method::HEAD,
            range: header_value(req, "range"),
            if_none_match: header_value(req, "if-none-match"),
            bypass,
            custom_tags,
        };

        Ok((ctx, origin))
    }

    async fn write_response(&self, session: &mut Session, response: ServiceResponse) -> Result<()> {
        let mut header = ResponseHeader::build(response.status, Some(response.headers.len() + 1))?;
        for (name, value) in &response.headers {
            header.insert_header(name.clone(), value.clone())?;
        }

        match response.body {
            ResponseBody::Empty => {
                session.write_response_header(Box::new(header), true).await?;
            }
            ResponseBody::Buffered(chunks) => {
                session.write_response_header(Box::new(header), chunks.is_empty()).await?;
                let last = chunks.len().saturating_sub(1);
                for (i, chunk) in chunks.into_iter().enumerate() {
                    session.write_response_body(Some(chunk), i == last).await?;
                }
            }
            ResponseBody::Streamed(mut stream) => {
                session.write_response_header(Box::new(header), false).await?;
                loop {
                    match stream.next().await {
                        Some(Ok(chunk)) => {
                            session.write_response_body(Some(chunk), false).await?;
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "origin stream failed mid-response");
                            break;
                        }
                        None => break,
                    }
                }
                session.write_response_body(Some(Bytes::new()), true).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ProxyHttp for GatewayProxy {
    type CTX = ();

    fn new_ctx(&self) -> Self::CTX {}

    /// Every request is answered here; the gateway never reaches
    /// `upstream_peer` because the "upstream" is the blob store fetched
    /// through the origin client, not an HTTP peer Pingora dials.
    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool> {
        let (ctx, origin) = match self.build_context(session) {
            Ok(pair) => pair,
            Err(response) => {
                self.write_response(session, response).await?;
                return Ok(true);
            }
        };

        let response = self.service.handle(ctx, origin).await;
        self.write_response(session, response).await?;
        Ok(true)
    }

    async fn upstream_peer(&self, _session: &mut Session, _ctx: &mut Self::CTX) -> Result<Box<HttpPeer>> {
        Err(Error::new_str(
            "gateway terminates every request in request_filter; no upstream peer is ever selected",
        ))
    }
}

fn header_value(req: &pingora_http::RequestHeader, name: &str) -> Option<String> {
    req.headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
}

fn host_header(req: &pingora_http::RequestHeader) -> Option<String> {
    header_value(req, "host").or_else(|| req.uri.authority().map(|a| a.as_str().to_string()))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (
                urlencoding::decode(k).unwrap_or_default().into_owned(),
                urlencoding::decode(v).unwrap_or_default().into_owned(),
            ),
            None => (urlencoding::decode(pair).unwrap_or_default().into_owned(), String::new()),
        })
        .collect()
}
