//! Edge-resident object gateway: a two-tier read-through cache (fast
//! in-memory tier plus a chunked key-value slow tier) fronting a blob-store
//! origin for HTTP GET/HEAD requests against opaque object keys.

pub mod cache;
pub mod config;
pub mod constants;
pub mod content_type;
pub mod error;
pub mod headers;
pub mod logging;
pub mod metrics;
pub mod origin;
pub mod proxy;
pub mod range;
pub mod retry;
pub mod router;
pub mod server;
pub mod service;
