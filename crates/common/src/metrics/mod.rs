//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the aggregation and synthesis
//! pipeline with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ContextFlow metrics
pub const METRICS_PREFIX: &str = "contextflow";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Fetch metrics
    describe_counter!(
        format!("{}_sources_fetched_total", METRICS_PREFIX),
        Unit::Count,
        "Total sources fetched successfully"
    );

    describe_counter!(
        format!("{}_fetch_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Total per-source fetch failures"
    );

    describe_histogram!(
        format!("{}_fetch_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Per-source fetch latency in seconds"
    );

    // Prompt metrics
    describe_counter!(
        format!("{}_prompts_total", METRICS_PREFIX),
        Unit::Count,
        "Total model prompts issued"
    );

    describe_counter!(
        format!("{}_prompt_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total model prompt failures"
    );

    describe_histogram!(
        format!("{}_prompt_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Model prompt latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record per-source fetch metrics
pub fn record_fetch(duration_secs: f64, success: bool) {
    if success {
        counter!(format!("{}_sources_fetched_total", METRICS_PREFIX)).increment(1);
        histogram!(format!("{}_fetch_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    } else {
        counter!(format!("{}_fetch_failures_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record model prompt metrics
pub fn record_prompt(duration_secs: f64, kind: &str, success: bool) {
    counter!(
        format!("{}_prompts_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "status" => if success { "success" } else { "error" }.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_prompt_duration_seconds", METRICS_PREFIX),
            "kind" => kind.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_prompt_errors_total", METRICS_PREFIX),
            "kind" => kind.to_string()
        )
        .increment(1);
    }
}
