// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Fallback,
    Failure,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Fallback => "fallback",
            Outcome::Failure => "failure",
        }
    }
}

pub struct MetricsCollector {
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,
    pub endpoint_picks_total: IntCounterVec,
    pub fallback_responses_total: IntCounterVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("turdus_requests_total", "Dispatched requests by outcome"),
            &["app", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "turdus_request_duration_seconds",
                "Dispatch duration in seconds",
            ),
            &["app"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let endpoint_picks_total = IntCounterVec::new(
            Opts::new("turdus_endpoint_picks_total", "Endpoint selections"),
            &["app", "server"],
        )?;
        registry.register(Box::new(endpoint_picks_total.clone()))?;

        let fallback_responses_total = IntCounterVec::new(
            Opts::new(
                "turdus_fallback_responses_total",
                "Failed requests answered from the fallback table",
            ),
            &["app", "path"],
        )?;
        registry.register(Box::new(fallback_responses_total.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            endpoint_picks_total,
            fallback_responses_total,
        })
    }

    pub fn record_request(&self, app: &str, outcome: Outcome, duration: std::time::Duration) {
        self.requests_total
            .with_label_values(&[app, outcome.as_str()])
            .inc();

        self.request_duration_seconds
            .with_label_values(&[app])
            .observe(duration.as_secs_f64());
    }

    pub fn record_pick(&self, app: &str, server: &str) {
        self.endpoint_picks_total
            .with_label_values(&[app, server])
            .inc();
    }

    pub fn record_fallback(&self, app: &str, path: &str) {
        self.fallback_responses_total
            .with_label_values(&[app, path])
            .inc();
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
