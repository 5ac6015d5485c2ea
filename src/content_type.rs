//! Content-type classification (component B).
//!
//! Maps a key's extension to a MIME type, and a MIME type to one of eight
//! coarse object categories used to pick per-category cache policy.

/// Coarse object category, used to select per-type cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    Image,
    Video,
    Audio,
    Font,
    Document,
    Static,
    Archive,
    Binary,
}

impl ObjectCategory {
    /// Stable lowercase name, used in `Cache-Tag` generation (`type-{name}`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectCategory::Image => "image",
            ObjectCategory::Video => "video",
            ObjectCategory::Audio => "audio",
            ObjectCategory::Font => "font",
            ObjectCategory::Document => "document",
            ObjectCategory::Static => "static",
            ObjectCategory::Archive => "archive",
            ObjectCategory::Binary => "binary",
        }
    }
}

const FALLBACK_MIME: &str = "application/octet-stream";

/// Fixed extension → MIME table. Extension lookup lowercases first and
/// takes the substring after the last `.`.
fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "avif" => "image/avif",

        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",

        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",

        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "csv" => "text/csv",

        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "wasm" => "application/wasm",

        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",

        _ => FALLBACK_MIME,
    }
}

/// Classify a key by extension into a MIME type. Lowercases the
/// extension; an unknown or missing extension falls back to
/// `application/octet-stream`.
pub fn classify_key(key: &str) -> &'static str {
    match key.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => mime_for_extension(&ext.to_ascii_lowercase()),
        _ => FALLBACK_MIME,
    }
}

/// Map a MIME type string to its object category.
///
/// Prefix matches (`image/`, `video/`, `audio/`, `font/`) take priority;
/// the remainder is covered by explicit archive/document/static sets;
/// everything else is `binary`.
pub fn classify_mime(mime: &str) -> ObjectCategory {
    let mime = mime.split(';').next().unwrap_or(mime).trim();

    if mime.starts_with("image/") {
        return ObjectCategory::Image;
    }
    if mime.starts_with("video/") {
        return ObjectCategory::Video;
    }
    if mime.starts_with("audio/") {
        return ObjectCategory::Audio;
    }
    if mime.starts_with("font/") {
        return ObjectCategory::Font;
    }

    const ARCHIVE: &[&str] = &[
        "application/zip",
        "application/gzip",
        "application/x-tar",
        "application/x-7z-compressed",
        "application/vnd.rar",
    ];
    if ARCHIVE.contains(&mime) {
        return ObjectCategory::Archive;
    }

    const DOCUMENT: &[&str] = &[
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.ms-powerpoint",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "text/csv",
    ];
    if DOCUMENT.contains(&mime) {
        return ObjectCategory::Document;
    }

    const STATIC: &[&str] = &[
        "text/html",
        "text/css",
        "application/javascript",
        "application/json",
        "application/xml",
        "text/plain",
        "application/wasm",
    ];
    if STATIC.contains(&mime) {
        return ObjectCategory::Static;
    }

    ObjectCategory::Binary
}
