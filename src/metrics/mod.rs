//! Prometheus metrics for the read path.
//!
//! Exposed for an operator-supplied `/metrics` endpoint; wiring that
//! endpoint itself is out of scope, same as health endpoints.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

/// Collection of counters/histograms tracking read-path behavior.
pub struct Metrics {
    /// Requests by terminal HTTP status.
    pub requests_total: IntCounterVec,
    /// Cache tier that served each hit (`fast`, `slow`, `origin`).
    pub tier_hits_total: IntCounterVec,
    /// Wall-clock duration of background populate operations, in seconds.
    pub populate_duration_seconds: Histogram,
}

impl Metrics {
    /// Create a fresh metrics set and register it with `registry`.
    pub fn new(registry: &Registry) -> Self {
        let requests_total = IntCounterVec::new(
            Opts::new("gateway_requests_total", "Requests by terminal HTTP status"),
            &["status"],
        )
        .expect("valid metric opts");

        let tier_hits_total = IntCounterVec::new(
            Opts::new("gateway_tier_hits_total", "Cache tier that served each hit"),
            &["tier"],
        )
        .expect("valid metric opts");

        let populate_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "gateway_populate_duration_seconds",
            "Duration of background cache-populate operations",
        ))
        .expect("valid histogram opts");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("register requests_total");
        registry
            .register(Box::new(tier_hits_total.clone()))
            .expect("register tier_hits_total");
        registry
            .register(Box::new(populate_duration_seconds.clone()))
            .expect("register populate_duration_seconds");

        Self {
            requests_total,
            tier_hits_total,
            populate_duration_seconds,
        }
    }

    pub fn record_status(&self, status: u16) {
        self.requests_total
            .with_label_values(&[&status.to_string()])
            .inc();
    }

    pub fn record_tier_hit(&self, tier: &str) {
        self.tier_hits_total.with_label_values(&[tier]).inc();
    }

    pub fn observe_populate_duration(&self, seconds: f64) {
        self.populate_duration_seconds.observe(seconds);
    }
}
