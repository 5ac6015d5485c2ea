//! Metadata record stored alongside every slow-tier base key.

use serde::{Deserialize, Serialize};

use crate::headers::HttpMetadata;

/// Small subset of response headers preserved verbatim across a cache
/// round-trip (beyond what's reconstructed from `Metadata` itself).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreservedHeaders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
}

impl PreservedHeaders {
    pub fn from_http_metadata(meta: &HttpMetadata, cache_tag: Option<String>) -> Self {
        Self {
            cache_control: meta.cache_control.clone(),
            cache_tag,
            last_modified: meta.last_modified.clone(),
            content_disposition: meta.content_disposition.clone(),
            content_encoding: meta.content_encoding.clone(),
            content_language: meta.content_language.clone(),
        }
    }
}

/// Fixed-size metadata blob stored out-of-band from the manifest/body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub content_type: String,
    pub content_length: u64,
    pub etag: String,
    pub is_chunked: bool,
    pub created_at: i64,
    pub max_age: u64,
    #[serde(rename = "headers")]
    pub preserved_headers: PreservedHeaders,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_through_json() {
        let meta = Metadata {
            content_type: "image/jpeg".to_string(),
            content_length: 2048,
            etag: "\"abc\"".to_string(),
            is_chunked: false,
            created_at: 1_700_000_000_000,
            max_age: 3600,
            preserved_headers: PreservedHeaders::default(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"contentType\":\"image/jpeg\""));
        assert!(json.contains("\"contentLength\":2048"));
        assert!(json.contains("\"isChunked\":false"));
        assert!(json.contains("\"createdAt\":1700000000000"));
        assert!(json.contains("\"maxAge\":3600"));
        assert!(json.contains("\"headers\":"));
        assert!(!json.contains("preserved_headers"));
        assert!(!json.contains("content_type"));
        let parsed: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.content_type, "image/jpeg");
        assert_eq!(parsed.content_length, 2048);
        assert!(!parsed.is_chunked);
    }

    #[test]
    fn preserved_headers_omits_absent_fields_from_json() {
        let headers = PreservedHeaders {
            last_modified: Some("Tue, 01 Jan 2030 00:00:00 GMT".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&headers).unwrap();
        assert!(json.contains("lastModified"));
        assert!(!json.contains("last_modified"));
        assert!(!json.contains("cacheControl"));
    }
}
