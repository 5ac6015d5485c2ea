//! Centralized error types for the gateway.
//!
//! Mirrors the status-code propagation policy of the read-path state
//! machine: most cache-layer failures are *local* (logged, never fatal to
//! the request) while a small set of request-level errors map directly to
//! an HTTP status.

use std::fmt;

/// Request-level error. Each variant maps to exactly one HTTP status via
/// [`GatewayError::status_code`].
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// The requested object does not exist at the origin.
    NotFound,
    /// A conditional request's precondition was satisfied by the origin
    /// (body withheld).
    NotModified {
        etag: String,
    },
    /// The origin could not be reached or returned an unexpected error
    /// after retries were exhausted.
    OriginTransport(String),
    /// A route or bucket binding was missing or contradictory.
    Configuration(String),
    /// Anything else unanticipated.
    Internal(String),
}

impl GatewayError {
    /// HTTP status this error should surface as, per the propagation
    /// policy: local cache errors never reach this type, they are logged
    /// and swallowed at the point of occurrence instead.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::NotFound => 404,
            GatewayError::NotModified { .. } => 304,
            GatewayError::OriginTransport(_) => 502,
            GatewayError::Configuration(_) => 500,
            GatewayError::Internal(_) => 500,
        }
    }

    /// Plain-text body to accompany the status code. No structured error
    /// payload is exposed to clients.
    pub fn body_text(&self) -> String {
        match self {
            GatewayError::NotFound => "Not Found".to_string(),
            GatewayError::NotModified { .. } => String::new(),
            GatewayError::OriginTransport(_) => "Bad Gateway".to_string(),
            GatewayError::Configuration(_) => "Internal Server Error".to_string(),
            GatewayError::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NotFound => write!(f, "object not found"),
            GatewayError::NotModified { etag } => write!(f, "not modified (etag {})", etag),
            GatewayError::OriginTransport(msg) => write!(f, "origin transport error: {}", msg),
            GatewayError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(GatewayError::NotFound.status_code(), 404);
    }

    #[test]
    fn not_modified_maps_to_304_with_empty_body() {
        let err = GatewayError::NotModified {
            etag: "\"abc\"".to_string(),
        };
        assert_eq!(err.status_code(), 304);
        assert_eq!(err.body_text(), "");
    }

    #[test]
    fn origin_transport_maps_to_502() {
        let err = GatewayError::OriginTransport("timeout".to_string());
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.body_text(), "Bad Gateway");
    }

    #[test]
    fn configuration_and_internal_map_to_500() {
        assert_eq!(
            GatewayError::Configuration("missing bucket".to_string()).status_code(),
            500
        );
        assert_eq!(
            GatewayError::Internal("panic".to_string()).status_code(),
            500
        );
    }

    #[test]
    fn display_includes_context() {
        let err = GatewayError::Configuration("no default bucket".to_string());
        assert!(err.to_string().contains("no default bucket"));
    }
}
