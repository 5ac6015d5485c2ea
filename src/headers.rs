//! Response header composition (component C).
//!
//! Turns origin metadata plus the effective cache policy into the finished
//! header set a response carries back to the client. Pure data in, data
//! out — no request/session types touched here, so this is usable from
//! both the origin-dispatch path and the cache-read paths.

use crate::content_type::ObjectCategory;

/// Origin-recorded headers the origin allows to pass through verbatim.
#[derive(Debug, Clone, Default)]
pub struct HttpMetadata {
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub cache_control: Option<String>,
}

/// Cache-policy knobs that shape `Cache-Control` and `Cache-Tag`.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub default_max_age_secs: u64,
    pub category_max_age_secs: Option<u64>,
    pub stale_while_revalidate_secs: u64,
    pub tags_enabled: bool,
    pub tag_prefix: String,
    pub default_tags: Vec<String>,
    pub category_tags: Vec<String>,
}

impl CachePolicy {
    pub fn max_age(&self) -> u64 {
        self.category_max_age_secs.unwrap_or(self.default_max_age_secs)
    }
}

/// Everything the header builder needs to know about the object being
/// served, independent of the request that triggered it.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub etag: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub http_metadata: HttpMetadata,
    pub category: ObjectCategory,
}

/// A single finished header, preserving insertion order for deterministic
/// output (tests assert exact header ordering in a few places).
pub type HeaderList = Vec<(String, String)>;

/// Sanitize a caller-supplied custom tag: only alphanumerics, `-`, `_`,
/// `.`, `/` survive; everything else is dropped.
fn sanitize_tag(tag: &str) -> String {
    tag.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
        .collect()
}

/// Build the response header set for a non-range (or already-sliced)
/// response body of `content_length` bytes.
///
/// `host` and `key` identify the object for the object-specific cache tag.
/// `custom_tags` are caller-supplied (e.g. query-parameter driven) and are
/// sanitized before inclusion.
pub fn build_headers(
    meta: &ObjectMeta,
    host: &str,
    key: &str,
    content_length: u64,
    policy: &CachePolicy,
    bypass: bool,
    custom_tags: &[String],
) -> HeaderList {
    let mut headers = HeaderList::new();

    let content_type = meta
        .http_metadata
        .content_type
        .clone()
        .or_else(|| meta.content_type.clone())
        .unwrap_or_else(|| crate::content_type::classify_key(key).to_string());

    headers.push(("Content-Type".to_string(), content_type));
    headers.push(("Content-Length".to_string(), content_length.to_string()));
    headers.push(("ETag".to_string(), meta.etag.clone()));
    headers.push(("Accept-Ranges".to_string(), "bytes".to_string()));
    headers.push(("X-Content-Type-Options".to_string(), "nosniff".to_string()));

    if bypass {
        headers.push(("Cache-Control".to_string(), "no-store, max-age=0".to_string()));
    } else {
        headers.push((
            "Cache-Control".to_string(),
            format!(
                "public, max-age={}, stale-while-revalidate={}",
                policy.max_age(),
                policy.stale_while_revalidate_secs
            ),
        ));

        if policy.tags_enabled {
            let mut tags = Vec::new();
            tags.push(format!("{}{}/{}", policy.tag_prefix, host, key));
            tags.push(format!("{}type-{}", policy.tag_prefix, meta.category.as_str()));
            for t in &policy.category_tags {
                tags.push(format!("{}{}", policy.tag_prefix, t));
            }
            for t in &policy.default_tags {
                tags.push(format!("{}{}", policy.tag_prefix, t));
            }
            for t in custom_tags {
                let sanitized = sanitize_tag(t);
                if !sanitized.is_empty() {
                    tags.push(format!("{}{}", policy.tag_prefix, sanitized));
                }
            }
            if !tags.is_empty() {
                headers.push(("Cache-Tag".to_string(), tags.join(",")));
            }
        }
    }

    if let Some(v) = &meta.http_metadata.last_modified {
        headers.push(("Last-Modified".to_string(), v.clone()));
    }
    if let Some(v) = &meta.http_metadata.content_disposition {
        headers.push(("Content-Disposition".to_string(), v.clone()));
    }
    if let Some(v) = &meta.http_metadata.content_encoding {
        headers.push(("Content-Encoding".to_string(), v.clone()));
    }
    if let Some(v) = &meta.http_metadata.content_language {
        headers.push(("Content-Language".to_string(), v.clone()));
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ObjectMeta {
        ObjectMeta {
            etag: "\"abc123\"".to_string(),
            size: 2048,
            content_type: Some("image/jpeg".to_string()),
            http_metadata: HttpMetadata::default(),
            category: ObjectCategory::Image,
        }
    }

    fn policy() -> CachePolicy {
        CachePolicy {
            default_max_age_secs: 3600,
            category_max_age_secs: None,
            stale_while_revalidate_secs: 60,
            tags_enabled: true,
            tag_prefix: "cdn-".to_string(),
            default_tags: vec![],
            category_tags: vec![],
        }
    }

    fn find<'a>(headers: &'a HeaderList, name: &str) -> Option<&'a str> {
        headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn builds_basic_headers() {
        let h = build_headers(&meta(), "cdn.example", "photo.jpg", 2048, &policy(), false, &[]);
        assert_eq!(find(&h, "Content-Type"), Some("image/jpeg"));
        assert_eq!(find(&h, "Content-Length"), Some("2048"));
        assert_eq!(find(&h, "ETag"), Some("\"abc123\""));
        assert_eq!(find(&h, "Accept-Ranges"), Some("bytes"));
        assert_eq!(find(&h, "X-Content-Type-Options"), Some("nosniff"));
    }

    #[test]
    fn cache_control_uses_default_max_age_and_swr() {
        let h = build_headers(&meta(), "cdn.example", "photo.jpg", 2048, &policy(), false, &[]);
        assert_eq!(
            find(&h, "Cache-Control"),
            Some("public, max-age=3600, stale-while-revalidate=60")
        );
    }

    #[test]
    fn category_max_age_overrides_default() {
        let mut p = policy();
        p.category_max_age_secs = Some(86400);
        let h = build_headers(&meta(), "cdn.example", "photo.jpg", 2048, &p, false, &[]);
        assert_eq!(
            find(&h, "Cache-Control"),
            Some("public, max-age=86400, stale-while-revalidate=60")
        );
    }

    #[test]
    fn cache_tag_includes_object_and_category_tags() {
        let h = build_headers(&meta(), "cdn.example", "photo.jpg", 2048, &policy(), false, &[]);
        let tag = find(&h, "Cache-Tag").unwrap();
        assert!(tag.contains("cdn-cdn.example/photo.jpg"));
        assert!(tag.contains("cdn-type-image"));
    }

    #[test]
    fn cache_tag_includes_category_default_and_custom_tags_in_order() {
        let mut p = policy();
        p.category_tags = vec!["homepage".to_string()];
        p.default_tags = vec!["all-objects".to_string()];
        let h = build_headers(
            &meta(),
            "cdn.example",
            "photo.jpg",
            2048,
            &p,
            false,
            &["release-42".to_string()],
        );
        assert_eq!(
            find(&h, "Cache-Tag"),
            Some("cdn-cdn.example/photo.jpg,cdn-type-image,cdn-homepage,cdn-all-objects,cdn-release-42")
        );
    }

    #[test]
    fn custom_tag_sanitization_strips_disallowed_characters() {
        let h = build_headers(
            &meta(),
            "cdn.example",
            "photo.jpg",
            2048,
            &policy(),
            false,
            &["weird tag!@#".to_string()],
        );
        let tag = find(&h, "Cache-Tag").unwrap();
        assert!(tag.contains("cdn-weirdtag"));
    }

    #[test]
    fn custom_tag_that_sanitizes_to_empty_is_dropped() {
        let h = build_headers(
            &meta(),
            "cdn.example",
            "photo.jpg",
            2048,
            &policy(),
            false,
            &["!@#$".to_string()],
        );
        let tag = find(&h, "Cache-Tag").unwrap();
        assert!(!tag.ends_with(','));
        assert!(!tag.contains(",,"));
    }

    #[test]
    fn bypass_disables_caching_and_tags() {
        let h = build_headers(&meta(), "cdn.example", "photo.jpg", 2048, &policy(), true, &[]);
        assert_eq!(find(&h, "Cache-Control"), Some("no-store, max-age=0"));
        assert_eq!(find(&h, "Cache-Tag"), None);
        assert_eq!(find(&h, "Content-Type"), Some("image/jpeg"));
        assert_eq!(find(&h, "ETag"), Some("\"abc123\""));
    }

    #[test]
    fn tags_disabled_emits_no_cache_tag_header() {
        let mut p = policy();
        p.tags_enabled = false;
        let h = build_headers(&meta(), "cdn.example", "photo.jpg", 2048, &p, false, &[]);
        assert_eq!(find(&h, "Cache-Tag"), None);
    }

    #[test]
    fn content_type_falls_back_to_extension_when_origin_silent() {
        let mut m = meta();
        m.content_type = None;
        let h = build_headers(&m, "cdn.example", "photo.jpg", 2048, &policy(), false, &[]);
        assert_eq!(find(&h, "Content-Type"), Some("image/jpeg"));
    }

    #[test]
    fn http_metadata_content_type_takes_priority() {
        let mut m = meta();
        m.http_metadata.content_type = Some("image/png".to_string());
        let h = build_headers(&m, "cdn.example", "photo.jpg", 2048, &policy(), false, &[]);
        assert_eq!(find(&h, "Content-Type"), Some("image/png"));
    }

    #[test]
    fn propagates_preserved_headers_when_present() {
        let mut m = meta();
        m.http_metadata.last_modified = Some("Tue, 01 Jan 2030 00:00:00 GMT".to_string());
        m.http_metadata.content_disposition = Some("attachment; filename=\"a.jpg\"".to_string());
        let h = build_headers(&m, "cdn.example", "photo.jpg", 2048, &policy(), false, &[]);
        assert_eq!(find(&h, "Last-Modified"), Some("Tue, 01 Jan 2030 00:00:00 GMT"));
        assert_eq!(find(&h, "Content-Disposition"), Some("attachment; filename=\"a.jpg\""));
    }

    #[test]
    fn content_length_reflects_range_slice_not_object_size() {
        let h = build_headers(&meta(), "cdn.example", "photo.jpg", 1024, &policy(), false, &[]);
        assert_eq!(find(&h, "Content-Length"), Some("1024"));
    }
}
