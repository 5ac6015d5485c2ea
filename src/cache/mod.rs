//! The two-tier read-through cache: an in-process fast tier (component
//! "edge cache") in front of a chunked key-value slow tier (component F).

pub mod fast;
pub mod kv;

pub use fast::{EdgeCache, FastCacheEntry, FastLookup};
