//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Histogram, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Chat relay metrics
    pub chat_requests: CounterVec,
    pub chat_request_duration: HistogramVec,
    pub chat_token_estimate: Histogram,
    pub summarizations: Counter,

    // Upstream call metrics
    pub upstream_requests: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let chat_requests = register_counter_vec_with_registry!(
            Opts::new("chat_requests_total", "Total chat relay requests"),
            &["outcome"],
            registry
        )?;

        let chat_request_duration = register_histogram_vec_with_registry!(
            "chat_request_duration_seconds",
            "Chat request duration in seconds",
            &["path"],
            registry
        )?;

        let chat_token_estimate = register_histogram_with_registry!(
            "chat_token_estimate",
            "Estimated token cost of incoming requests",
            registry
        )?;

        let summarizations = register_counter_with_registry!(
            Opts::new("summarizations_total", "Total context summarizations performed"),
            registry
        )?;

        let upstream_requests = register_counter_vec_with_registry!(
            Opts::new("upstream_requests_total", "Total upstream completion calls"),
            &["mode", "status"],
            registry
        )?;

        Ok(Self {
            registry,
            chat_requests,
            chat_request_duration,
            chat_token_estimate,
            summarizations,
            upstream_requests,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a chat request outcome
    pub fn record_chat(&self, outcome: &str) {
        self.chat_requests.with_label_values(&[outcome]).inc();
    }

    /// Record the token estimate of an incoming request
    pub fn record_estimate(&self, estimate: f64) {
        self.chat_token_estimate.observe(estimate);
    }

    /// Record a summarization event
    pub fn record_summarization(&self) {
        self.summarizations.inc();
    }

    /// Record an upstream call
    pub fn record_upstream(&self, mode: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.upstream_requests.with_label_values(&[mode, status]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_chat_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_chat("success");
        metrics.record_chat("oversized_turn");
        metrics.record_upstream("stream", true);
        metrics.record_upstream("complete", false);
        // Metrics should be recorded without panicking
    }

    #[test]
    fn test_export_contains_registered_families() {
        let metrics = Metrics::new().unwrap();
        metrics.record_chat("success");
        metrics.record_estimate(42.0);

        let exported = metrics.export_prometheus();
        assert!(exported.contains("chat_requests_total"));
        assert!(exported.contains("chat_token_estimate"));
    }
}
