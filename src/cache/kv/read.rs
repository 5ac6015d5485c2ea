//! Chunked-KV reader (§4.F.3).
//!
//! Any read-side exception — a missing key, malformed JSON, a length
//! mismatch — resolves to [`ReadOutcome::Miss`]; nothing here is fatal to
//! the request.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::range::parse_range;

use super::key::{body_key, chunk_key};
use super::manifest::ManifestValue;
use super::metadata::{Metadata, PreservedHeaders};
use super::store::KvStore;

#[derive(Debug, Clone)]
pub struct ReadMeta {
    pub content_type: String,
    pub etag: String,
    pub total_size: u64,
    pub preserved: PreservedHeaders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyRange {
    pub start: u64,
    pub end: u64,
}

pub enum ReadOutcome {
    Miss,
    /// 200, full object. `body` is the ordered sequence of byte runs to
    /// stream to the client (chunk-by-chunk for the chunked layout).
    Full { meta: ReadMeta, body: Vec<Bytes> },
    /// 206, a single satisfiable range.
    Partial { meta: ReadMeta, range: BodyRange, body: Vec<Bytes> },
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn split_record(record: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = record.iter().position(|&b| b == b'\n')?;
    Some((&record[..pos], &record[pos + 1..]))
}

/// Read `base_key`, applying `range` (a raw `Range` header value) if
/// present.
pub async fn read(store: &dyn KvStore, base_key: &str, range: Option<&str>) -> ReadOutcome {
    let record = match store.get(base_key).await {
        Ok(Some(bytes)) => bytes,
        _ => return ReadOutcome::Miss,
    };

    let Some((manifest_json, metadata_json)) = split_record(&record) else {
        return ReadOutcome::Miss;
    };

    let Ok(manifest) = serde_json::from_slice::<ManifestValue>(manifest_json) else {
        return ReadOutcome::Miss;
    };
    let Ok(metadata) = serde_json::from_slice::<Metadata>(metadata_json) else {
        return ReadOutcome::Miss;
    };

    if now_ms() - metadata.created_at > metadata.max_age as i64 * 1000 {
        return ReadOutcome::Miss;
    }

    let meta = ReadMeta {
        content_type: metadata.content_type.clone(),
        etag: metadata.etag.clone(),
        total_size: metadata.content_length,
        preserved: metadata.preserved_headers.clone(),
    };

    match manifest {
        ManifestValue::SingleEntry { .. } => read_single(store, base_key, &metadata, meta, range).await,
        ManifestValue::Chunked(manifest) => read_chunked(store, base_key, &manifest, meta, range).await,
    }
}

async fn read_single(
    store: &dyn KvStore,
    base_key: &str,
    metadata: &Metadata,
    meta: ReadMeta,
    range: Option<&str>,
) -> ReadOutcome {
    let body = match store.get(&body_key(base_key)).await {
        Ok(Some(bytes)) if bytes.len() as u64 == metadata.content_length => bytes,
        _ => return ReadOutcome::Miss,
    };

    if let Some(range_header) = range {
        if let Ok(parsed) = parse_range(range_header, metadata.content_length) {
            let slice = body.slice(parsed.start as usize..=parsed.end as usize);
            return ReadOutcome::Partial {
                meta,
                range: BodyRange { start: parsed.start, end: parsed.end },
                body: vec![slice],
            };
        }
    }

    ReadOutcome::Full { meta, body: vec![body] }
}

async fn read_chunked(
    store: &dyn KvStore,
    base_key: &str,
    manifest: &super::manifest::ChunkManifest,
    meta: ReadMeta,
    range: Option<&str>,
) -> ReadOutcome {
    if manifest.chunk_sizes.len() != manifest.chunk_count {
        return ReadOutcome::Miss;
    }

    if let Some(range_header) = range {
        if let Ok(parsed) = parse_range(range_header, manifest.total_size) {
            let selected = manifest.chunks_for_range(parsed.start, parsed.end);
            let mut body = Vec::with_capacity(selected.len());
            for (index, local_start, local_end) in selected {
                let chunk = match store.get(&chunk_key(base_key, index)).await {
                    Ok(Some(bytes)) => bytes,
                    _ => return ReadOutcome::Miss,
                };
                if (local_end as usize) >= chunk.len() {
                    return ReadOutcome::Miss;
                }
                body.push(chunk.slice(local_start as usize..=local_end as usize));
            }
            return ReadOutcome::Partial {
                meta,
                range: BodyRange { start: parsed.start, end: parsed.end },
                body,
            };
        }
    }

    let mut body = Vec::with_capacity(manifest.chunk_count);
    for index in 0..manifest.chunk_count {
        match store.get(&chunk_key(base_key, index)).await {
            Ok(Some(bytes)) => body.push(bytes),
            _ => return ReadOutcome::Miss,
        }
    }
    ReadOutcome::Full { meta, body }
}
