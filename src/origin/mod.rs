//! Origin client (component E): blob-store access with bounded retry.

mod client;

pub use client::{FetchOptions, FetchResult, OriginClient, OriginObject, RangeDescriptor};
