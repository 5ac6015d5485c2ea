//! Chunked-KV writers (§4.F.1, §4.F.2).

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};

use crate::constants::{
    CHUNK_SIZE_BYTES, MIN_WRITE_TTL_SECS, SINGLE_ENTRY_MAX_BYTES, TOTAL_MAX_BYTES,
};

use super::key::{body_key, chunk_key};
use super::manifest::{ChunkManifest, ManifestValue};
use super::metadata::Metadata;
use super::store::KvStore;

/// Headers captured alongside the body at write time.
#[derive(Debug, Clone)]
pub struct WriteHeaders {
    pub content_type: String,
    pub etag: String,
    pub preserved: super::metadata::PreservedHeaders,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn build_metadata(content_length: u64, headers: &WriteHeaders, max_age: u64, is_chunked: bool) -> Metadata {
    Metadata {
        content_type: headers.content_type.clone(),
        content_length,
        etag: headers.etag.clone(),
        is_chunked,
        created_at: now_ms(),
        max_age,
        preserved_headers: headers.preserved.clone(),
    }
}

fn write_ttl_ms(max_age: u64) -> u64 {
    max_age.max(MIN_WRITE_TTL_SECS) * 1000
}

/// Write a fully-buffered body. No-op when `bytes` exceeds `TOTAL_MAX`.
pub async fn write_buffered(
    store: &dyn KvStore,
    base_key: &str,
    bytes: Bytes,
    headers: &WriteHeaders,
    max_age: u64,
) -> Result<(), super::store::KvError> {
    let len = bytes.len() as u64;
    if len > TOTAL_MAX_BYTES {
        return Ok(());
    }

    let ttl_ms = write_ttl_ms(max_age);

    if len <= SINGLE_ENTRY_MAX_BYTES {
        let metadata = build_metadata(len, headers, max_age, false);
        let manifest_json = serde_json::to_vec(&ManifestValue::single_entry())
            .map_err(|e| super::store::KvError::Backend(e.to_string()))?;
        let record = encode_record(&manifest_json, &metadata)?;

        let (a, b) = futures::join!(
            store.set(base_key, Bytes::from(record), ttl_ms),
            store.set(&body_key(base_key), bytes, ttl_ms),
        );
        a?;
        b?;
        return Ok(());
    }

    let manifest = ChunkManifest::new(len, CHUNK_SIZE_BYTES);
    let metadata = build_metadata(len, headers, max_age, true);
    let manifest_json = serde_json::to_vec(&ManifestValue::Chunked(manifest.clone()))
        .map_err(|e| super::store::KvError::Backend(e.to_string()))?;
    let record = encode_record(&manifest_json, &metadata)?;

    let mut offset = 0usize;
    let mut chunk_keys = Vec::with_capacity(manifest.chunk_count);
    for &size in &manifest.chunk_sizes {
        let key = chunk_key(base_key, chunk_keys.len());
        let slice = bytes.slice(offset..offset + size as usize);
        offset += size as usize;
        chunk_keys.push((key, slice));
    }

    let base_fut = store.set(base_key, Bytes::from(record), ttl_ms);
    let chunk_futs = chunk_keys
        .iter()
        .map(|(key, slice)| store.set(key, slice.clone(), ttl_ms));
    let (base_result, chunk_results) =
        futures::join!(base_fut, futures::future::join_all(chunk_futs));

    base_result?;
    for r in chunk_results {
        r?;
    }
    Ok(())
}

/// Stream a body of known `total_size` into the slow tier with bounded
/// peak memory: one `CHUNK_SIZE`-wide accumulator at a time.
pub async fn write_stream<S, E>(
    store: &dyn KvStore,
    base_key: &str,
    mut stream: S,
    total_size: u64,
    headers: &WriteHeaders,
    max_age: u64,
) -> Result<(), super::store::KvError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    if total_size > TOTAL_MAX_BYTES {
        return Ok(());
    }

    let ttl_ms = write_ttl_ms(max_age);

    if total_size <= SINGLE_ENTRY_MAX_BYTES {
        let mut buf = BytesMut::with_capacity(total_size as usize);
        while let Some(frame) = stream.next().await {
            let frame = frame.map_err(|e| super::store::KvError::Backend(e.to_string()))?;
            buf.extend_from_slice(&frame);
        }
        return write_buffered(store, base_key, buf.freeze(), headers, max_age).await;
    }

    let chunk_size = CHUNK_SIZE_BYTES as usize;
    let mut accumulator = BytesMut::with_capacity(chunk_size);
    let mut chunk_index = 0usize;
    let mut chunk_sizes = Vec::new();
    let mut pending = Vec::new();

    while let Some(frame) = stream.next().await {
        let mut frame = frame.map_err(|e| super::store::KvError::Backend(e.to_string()))?;

        while !frame.is_empty() {
            let space = chunk_size - accumulator.len();
            let take = space.min(frame.len());
            accumulator.extend_from_slice(&frame[..take]);
            frame = frame.split_off(take);

            if accumulator.len() == chunk_size {
                chunk_sizes.push(accumulator.len() as u64);
                let owned = std::mem::replace(&mut accumulator, BytesMut::with_capacity(chunk_size)).freeze();
                pending.push(store.set(&chunk_key(base_key, chunk_index), owned, ttl_ms));
                chunk_index += 1;
            }
        }
    }

    if !accumulator.is_empty() {
        chunk_sizes.push(accumulator.len() as u64);
        let owned = accumulator.freeze();
        pending.push(store.set(&chunk_key(base_key, chunk_index), owned, ttl_ms));
        chunk_index += 1;
    }

    for fut in pending {
        fut.await?;
    }

    let manifest = ChunkManifest {
        total_size,
        chunk_count: chunk_index,
        chunk_sizes,
    };
    let metadata = build_metadata(total_size, headers, max_age, true);
    let manifest_json = serde_json::to_vec(&ManifestValue::Chunked(manifest))
        .map_err(|e| super::store::KvError::Backend(e.to_string()))?;
    let record = encode_record(&manifest_json, &metadata)?;
    store.set(base_key, Bytes::from(record), ttl_ms).await
}

/// The value stored at a base key: the manifest/sentinel JSON followed by
/// a newline and the metadata JSON.
pub(super) fn encode_record(manifest_json: &[u8], metadata: &Metadata) -> Result<Vec<u8>, super::store::KvError> {
    let metadata_json =
        serde_json::to_vec(metadata).map_err(|e| super::store::KvError::Backend(e.to_string()))?;
    let mut record = Vec::with_capacity(manifest_json.len() + metadata_json.len() + 1);
    record.extend_from_slice(manifest_json);
    record.push(b'\n');
    record.extend_from_slice(&metadata_json);
    Ok(record)
}
