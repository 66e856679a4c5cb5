//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_int_gauge_with_registry, Counter, CounterVec,
    HistogramVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Endpoint outcomes
    pub detect_requests: CounterVec,
    pub qa_requests: CounterVec,
    pub request_duration: HistogramVec,

    // Follow-up rewriting
    pub followup_rewrites: Counter,

    // Upstream model
    pub model_calls: CounterVec,
    pub model_call_duration: HistogramVec,

    // Session store
    pub active_sessions: IntGauge,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let detect_requests = register_counter_vec_with_registry!(
            Opts::new("detect_requests_total", "Detection requests by outcome"),
            &["outcome"],
            registry
        )?;

        let qa_requests = register_counter_vec_with_registry!(
            Opts::new("object_qa_requests_total", "Object Q&A requests by outcome"),
            &["outcome"],
            registry
        )?;

        let request_duration = register_histogram_vec_with_registry!(
            "request_duration_seconds",
            "Handler duration in seconds",
            &["endpoint"],
            registry
        )?;

        let followup_rewrites = register_counter_with_registry!(
            Opts::new(
                "followup_rewrites_total",
                "Questions joined with the previous question"
            ),
            registry
        )?;

        let model_calls = register_counter_vec_with_registry!(
            Opts::new("model_calls_total", "Vision model calls by operation and outcome"),
            &["operation", "outcome"],
            registry
        )?;

        let model_call_duration = register_histogram_vec_with_registry!(
            "model_call_duration_seconds",
            "Vision model call duration in seconds",
            &["operation"],
            registry
        )?;

        let active_sessions = register_int_gauge_with_registry!(
            Opts::new("active_sessions", "Sessions currently held in memory"),
            registry
        )?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            detect_requests,
            qa_requests,
            request_duration,
            followup_rewrites,
            model_calls,
            model_call_duration,
            active_sessions,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a detection outcome
    pub fn record_detect(&self, outcome: &str, elapsed: Duration) {
        self.detect_requests.with_label_values(&[outcome]).inc();
        self.request_duration
            .with_label_values(&["detect"])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a Q&A outcome
    pub fn record_qa(&self, outcome: &str, elapsed: Duration) {
        self.qa_requests.with_label_values(&[outcome]).inc();
        self.request_duration
            .with_label_values(&["object_qa"])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_followup_rewrite(&self) {
        self.followup_rewrites.inc();
    }

    /// Record one upstream model call
    pub fn record_model_call(&self, operation: &str, outcome: &str, elapsed: Duration) {
        self.model_calls
            .with_label_values(&[operation, outcome])
            .inc();
        self.model_call_duration
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    pub fn set_active_sessions(&self, count: u64) {
        self.active_sessions.set(count as i64);
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
