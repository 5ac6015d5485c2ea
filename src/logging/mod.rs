//! Structured logging setup using the `tracing` crate.

use std::error::Error;

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber for structured logging.
///
/// Configured with:
/// - JSON formatting for easy parsing by log aggregation systems
/// - Filtering from `RUST_LOG`, defaulting to `info`
/// - Output to stdout, suitable for container/cloud-native deployments
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_subscriber() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| e.into())
}
