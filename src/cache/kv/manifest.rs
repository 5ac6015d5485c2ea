//! Chunk manifest schema for the slow-tier storage format.
//!
//! The JSON value at a base key is either the single-entry sentinel or a
//! [`ChunkManifest`]; the manifest is the exclusive source of truth for
//! chunk boundaries, never recomputed from `total_size` and a fixed width.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestValue {
    SingleEntry { #[serde(rename = "singleEntry")] single_entry: bool },
    Chunked(ChunkManifest),
}

impl ManifestValue {
    pub fn single_entry() -> Self {
        ManifestValue::SingleEntry { single_entry: true }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, ManifestValue::Chunked(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkManifest {
    pub total_size: u64,
    pub chunk_count: usize,
    pub chunk_sizes: Vec<u64>,
}

impl ChunkManifest {
    /// Build a manifest for `total_size` bytes split into fixed-width
    /// `chunk_size` chunks (the last chunk may be short).
    pub fn new(total_size: u64, chunk_size: u64) -> Self {
        let chunk_count = total_size.div_ceil(chunk_size) as usize;
        let mut chunk_sizes = Vec::with_capacity(chunk_count);
        let mut remaining = total_size;
        for _ in 0..chunk_count {
            let this_chunk = remaining.min(chunk_size);
            chunk_sizes.push(this_chunk);
            remaining -= this_chunk;
        }
        ChunkManifest { total_size, chunk_count, chunk_sizes }
    }

    /// Byte offset at which chunk `index` begins.
    pub fn chunk_offset(&self, index: usize) -> u64 {
        self.chunk_sizes[..index].iter().sum()
    }

    /// Indices of the chunks overlapping `[start, end]` inclusive, along
    /// with the in-chunk byte offsets needed to slice each one.
    pub fn chunks_for_range(&self, start: u64, end: u64) -> Vec<(usize, u64, u64)> {
        let mut result = Vec::new();
        let mut offset = 0u64;
        for (index, &size) in self.chunk_sizes.iter().enumerate() {
            let chunk_start = offset;
            let chunk_end = offset + size - 1;
            if chunk_end >= start && chunk_start <= end {
                let local_start = start.max(chunk_start) - chunk_start;
                let local_end = end.min(chunk_end) - chunk_start;
                result.push((index, local_start, local_end));
            }
            offset += size;
            if offset > end {
                break;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_manifest_with_exact_multiple() {
        let m = ChunkManifest::new(40, 20);
        assert_eq!(m.chunk_count, 2);
        assert_eq!(m.chunk_sizes, vec![20, 20]);
    }

    #[test]
    fn builds_manifest_with_short_last_chunk() {
        let m = ChunkManifest::new(45, 20);
        assert_eq!(m.chunk_count, 3);
        assert_eq!(m.chunk_sizes, vec![20, 20, 5]);
    }

    #[test]
    fn chunk_offset_sums_preceding_sizes() {
        let m = ChunkManifest::new(45, 20);
        assert_eq!(m.chunk_offset(0), 0);
        assert_eq!(m.chunk_offset(1), 20);
        assert_eq!(m.chunk_offset(2), 40);
    }

    #[test]
    fn chunks_for_range_within_single_chunk() {
        let m = ChunkManifest::new(45, 20);
        let chunks = m.chunks_for_range(5, 15);
        assert_eq!(chunks, vec![(0, 5, 15)]);
    }

    #[test]
    fn chunks_for_range_spanning_multiple_chunks() {
        let m = ChunkManifest::new(45, 20);
        let chunks = m.chunks_for_range(15, 25);
        assert_eq!(chunks, vec![(0, 15, 19), (1, 0, 5)]);
    }

    #[test]
    fn chunks_for_range_covering_whole_object() {
        let m = ChunkManifest::new(45, 20);
        let chunks = m.chunks_for_range(0, 44);
        assert_eq!(chunks, vec![(0, 0, 19), (1, 0, 19), (2, 0, 4)]);
    }

    #[test]
    fn manifest_value_single_entry_round_trips() {
        let v = ManifestValue::single_entry();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"singleEntry":true}"#);
        let parsed: ManifestValue = serde_json::from_str(&json).unwrap();
        assert!(!parsed.is_chunked());
    }

    #[test]
    fn manifest_value_chunked_round_trips() {
        let v = ManifestValue::Chunked(ChunkManifest::new(45, 20));
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"totalSize\":45"));
        assert!(json.contains("\"chunkCount\":3"));
        assert!(json.contains("\"chunkSizes\":[20,20,5]"));
        assert!(!json.contains("total_size"));
        let parsed: ManifestValue = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_chunked());
    }
}
