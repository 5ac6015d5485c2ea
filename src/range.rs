//! HTTP `Range` header parsing (component A).
//!
//! Accepts a single `bytes=<start>-<end>` value with independently optional
//! bounds, or the suffix form `bytes=-<N>`. Multi-range values are rejected
//! outright; this gateway has no multi-range response support.

use std::fmt;

/// A normalized, inclusive byte interval `[start, end]` against a known
/// total size, satisfying `0 <= start <= end < total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by this range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Render the `Content-Range: bytes {start}-{end}/{total}` header value.
    pub fn content_range_header(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Failure modes for `Range` parsing, per §4.A.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The header value does not match the single-range grammar, or
    /// specifies more than one range.
    Unparseable,
    /// The header was syntactically valid but describes a range that
    /// cannot be satisfied against the object's size.
    Unsatisfiable,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::Unparseable => write!(f, "unparseable range"),
            RangeError::Unsatisfiable => write!(f, "unsatisfiable range"),
        }
    }
}

/// Parse a `Range` header value against an object of size `total`.
///
/// `bytes=-N` clamps to the whole body when `N >= total`, matching the
/// suffix-range semantics of RFC 9110 §14.1.2.
pub fn parse_range(value: &str, total: u64) -> Result<ByteRange, RangeError> {
    let value = value.trim();
    let spec = value.strip_prefix("bytes=").ok_or(RangeError::Unparseable)?;

    // Multi-range values contain a comma; we don't support them.
    if spec.contains(',') {
        return Err(RangeError::Unparseable);
    }

    let (start_str, end_str) = spec.split_once('-').ok_or(RangeError::Unparseable)?;

    if start_str.is_empty() {
        // Suffix range: bytes=-N
        if end_str.is_empty() {
            return Err(RangeError::Unparseable);
        }
        let suffix_len: u64 = end_str.parse().map_err(|_| RangeError::Unparseable)?;
        if suffix_len == 0 {
            return Err(RangeError::Unsatisfiable);
        }
        if total == 0 {
            return Err(RangeError::Unsatisfiable);
        }
        let clamped = suffix_len.min(total);
        return Ok(ByteRange {
            start: total - clamped,
            end: total - 1,
        });
    }

    let start: u64 = start_str.parse().map_err(|_| RangeError::Unparseable)?;
    let end: u64 = if end_str.is_empty() {
        if total == 0 {
            return Err(RangeError::Unsatisfiable);
        }
        total - 1
    } else {
        end_str.parse().map_err(|_| RangeError::Unparseable)?
    };

    if start >= total || start > end {
        return Err(RangeError::Unsatisfiable);
    }

    let end = end.min(total.saturating_sub(1));

    Ok(ByteRange { start, end })
}
