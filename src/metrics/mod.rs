//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, Counter, CounterVec, HistogramVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Request lifecycle
    pub ideation_requests: CounterVec,
    pub step_duration: HistogramVec,

    // Backends
    pub llm_requests: CounterVec,
    pub search_requests: CounterVec,
    pub embedding_requests: CounterVec,

    // Degradation
    pub pipeline_fallbacks: CounterVec,

    // Streaming
    pub stream_heartbeats: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let ideation_requests = register_counter_vec_with_registry!(
            Opts::new("ideation_requests_total", "Total ideation requests by outcome"),
            &["status"],
            registry
        )?;

        let step_duration = register_histogram_vec_with_registry!(
            "ideation_step_duration_seconds",
            "Duration of each pipeline step in seconds",
            &["step"],
            vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0],
            registry
        )?;

        let llm_requests = register_counter_vec_with_registry!(
            Opts::new("llm_requests_total", "Total chat completion calls"),
            &["prompt", "status"],
            registry
        )?;

        let search_requests = register_counter_vec_with_registry!(
            Opts::new("search_requests_total", "Total paper search calls"),
            &["strategy", "status"],
            registry
        )?;

        let embedding_requests = register_counter_vec_with_registry!(
            Opts::new("embedding_requests_total", "Total embedding calls"),
            &["status"],
            registry
        )?;

        let pipeline_fallbacks = register_counter_vec_with_registry!(
            Opts::new("pipeline_fallbacks_total", "Degraded results substituted for failed stages"),
            &["stage"],
            registry
        )?;

        let stream_heartbeats = register_counter_with_registry!(
            Opts::new("stream_heartbeats_total", "Total heartbeat events emitted"),
            registry
        )?;

        Ok(Self {
            registry,
            ideation_requests,
            step_duration,
            llm_requests,
            search_requests,
            embedding_requests,
            pipeline_fallbacks,
            stream_heartbeats,
        })
    }

    /// Record the terminal outcome of an ideation request
    pub fn record_request(&self, status: &str) {
        self.ideation_requests.with_label_values(&[status]).inc();
    }

    pub fn record_step(&self, step: &str, elapsed: Duration) {
        self.step_duration
            .with_label_values(&[step])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a chat completion call
    pub fn record_llm(&self, prompt: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.llm_requests.with_label_values(&[prompt, status]).inc();
    }

    /// Record a paper search call
    pub fn record_search(&self, strategy: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.search_requests.with_label_values(&[strategy, status]).inc();
    }

    pub fn record_embedding(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.embedding_requests.with_label_values(&[status]).inc();
    }

    /// Record a stage that fell back to its degraded result
    pub fn record_fallback(&self, stage: &str) {
        self.pipeline_fallbacks.with_label_values(&[stage]).inc();
    }

    pub fn record_heartbeat(&self) {
        self.stream_heartbeats.inc();
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
