//! Slow-tier key formatting and hashing.
//!
//! Long keys are collision-hashed with SHA-256 so a pathologically long
//! object path never produces a Redis key past the practical limit.

use sha2::{Digest, Sha256};

/// Practical Redis key length limit; longer keys are hashed instead.
pub const MAX_KEY_LENGTH: usize = 250;

/// Format the base key for `{bucket}/{object_key}` under `prefix`.
///
/// Short keys: `{prefix}:{bucket}:{object_key}` (URL-encoded). Long keys
/// fall back to `{prefix}:hash:{sha256}`.
pub fn format_base_key(prefix: &str, bucket: &str, object_key: &str) -> String {
    let encoded_key = urlencoding::encode(object_key);
    let full_key = format!("{}:{}:{}", prefix, bucket, encoded_key);

    if full_key.len() > MAX_KEY_LENGTH {
        hash_long_key(prefix, bucket, object_key)
    } else {
        full_key
    }
}

fn hash_long_key(prefix: &str, bucket: &str, object_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bucket.as_bytes());
    hasher.update(b":");
    hasher.update(object_key.as_bytes());
    let hash_hex = hex::encode(hasher.finalize());
    format!("{}:hash:{}", prefix, hash_hex)
}

/// Companion key holding the full body of a single-entry cache record.
pub fn body_key(base_key: &str) -> String {
    format!("{}_body", base_key)
}

/// Companion key holding chunk `index` of a chunked cache record.
pub fn chunk_key(base_key: &str, index: usize) -> String {
    format!("{}_chunk_{}", base_key, index)
}
