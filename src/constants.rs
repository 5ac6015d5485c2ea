// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Server defaults
// =============================================================================

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

// =============================================================================
// Origin (blob store) defaults
// =============================================================================

/// Default origin operation timeout in seconds
pub const DEFAULT_ORIGIN_TIMEOUT_SECS: u64 = 20;

// =============================================================================
// Cache policy defaults
// =============================================================================

/// Default Cache-Control max-age in seconds, when no category override applies
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Default stale-while-revalidate window in seconds
pub const DEFAULT_STALE_WHILE_REVALIDATE_SECS: u64 = 60;

/// Default cache-tag prefix
pub const DEFAULT_TAG_PREFIX: &str = "";

/// Default name of the bypass query parameter
pub const DEFAULT_BYPASS_PARAM_NAME: &str = "no-cache";

// =============================================================================
// Fast tier (edge cache) defaults
// =============================================================================

/// Per-entry size cap for the fast (in-memory) tier. Objects larger than this
/// are written to the slow (chunked KV) tier instead. The source system
/// documents ~28 MiB empirically for its edge cache; this is a tunable
/// constant, not a protocol requirement.
pub const FAST_CACHE_CAP_BYTES: u64 = 25 * 1024 * 1024;

/// Maximum aggregate size of the in-process fast tier.
pub const FAST_CACHE_MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024;

/// Default TTL applied to fast-tier entries when no max-age is known.
pub const DEFAULT_FAST_CACHE_TTL_SECS: u64 = 3600;

// =============================================================================
// Chunked-KV (slow tier) defaults
// =============================================================================

/// Cutoff below which an object is stored as a single KV entry rather than
/// split into chunks.
pub const SINGLE_ENTRY_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Width of each chunk in the chunked layout. Kept equal to
/// `SINGLE_ENTRY_MAX_BYTES` per the recommended sizing.
pub const CHUNK_SIZE_BYTES: u64 = 20 * 1024 * 1024;

/// Hard cap beyond which the chunked-KV format refuses to cache an object.
pub const TOTAL_MAX_BYTES: u64 = 500 * 1024 * 1024;

/// Floor applied to the TTL hint used for KV reads.
pub const MIN_READ_TTL_SECS: u64 = 60;

/// Floor applied to the TTL used for KV writes.
pub const MIN_WRITE_TTL_SECS: u64 = 60;

/// Upper bound on the serialized metadata blob stored alongside each
/// chunked-KV entry (content-type, etag, preserved headers, ...).
pub const METADATA_BLOB_MAX_BYTES: usize = 1024;

// =============================================================================
// Retry defaults
// =============================================================================

/// Default maximum retry attempts against the origin.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base retry delay in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;
