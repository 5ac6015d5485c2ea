//! Object Service (component G): the per-request read-path state machine.

pub mod pipeline;
pub mod populate;
pub mod stream;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::headers::HeaderList;

pub use pipeline::ObjectService;

/// Everything the state machine needs about one incoming request, already
/// resolved by the router and normalized by INIT.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub host: String,
    pub bucket_identifier: String,
    pub key: String,
    pub is_head: bool,
    pub range: Option<String>,
    pub if_none_match: Option<String>,
    pub bypass: bool,
    pub custom_tags: Vec<String>,
}

/// A finished response body, either already in memory (cache hits) or a
/// stream driven by the origin fetch (misses).
pub enum ResponseBody {
    Empty,
    Buffered(Vec<Bytes>),
    Streamed(BoxStream<'static, Result<Bytes, String>>),
}

pub struct ServiceResponse {
    pub status: u16,
    pub headers: HeaderList,
    pub body: ResponseBody,
}

impl ServiceResponse {
    pub(crate) fn text(status: u16, body: &str) -> Self {
        ServiceResponse {
            status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: if body.is_empty() { ResponseBody::Empty } else { ResponseBody::Buffered(vec![Bytes::copy_from_slice(body.as_bytes())]) },
        }
    }
}
