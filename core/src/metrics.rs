//! Request outcome counters and latency histogram.
//!
//! The orchestrator only sees `MetricsCollector`; the process owns the
//! concrete collector and decides how it is exported.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

use crate::{AdvisorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }

    pub fn of<T>(result: &Result<T>) -> Self {
        if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Error
        }
    }
}

/// Sink for per-request metrics. Implementations must tolerate concurrent calls.
pub trait MetricsCollector: Send + Sync {
    fn record_outcome(&self, outcome: Outcome);
    fn observe_duration(&self, seconds: f64);
}

/// Per-call guard: on drop it records exactly one outcome and one latency sample.
///
/// The outcome defaults to `Error`, so a call whose future is dropped before it
/// finishes is still counted.
pub struct RequestTimer<'a> {
    metrics: &'a dyn MetricsCollector,
    started: Instant,
    outcome: Option<Outcome>,
}

impl<'a> RequestTimer<'a> {
    pub fn start(metrics: &'a dyn MetricsCollector) -> Self {
        Self {
            metrics,
            started: Instant::now(),
            outcome: None,
        }
    }

    /// Set the outcome reported when the guard drops.
    pub fn complete(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics
            .record_outcome(self.outcome.unwrap_or(Outcome::Error));
        self.metrics
            .observe_duration(self.started.elapsed().as_secs_f64());
    }
}

/// Prometheus-backed collector
#[derive(Clone)]
pub struct PrometheusMetrics {
    requests_total: IntCounterVec,
    request_duration: Histogram,
    registry: Registry,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("advisor_requests_total", "Total advisor requests"),
            &["status"],
        )?;
        let request_duration = Histogram::with_opts(HistogramOpts::new(
            "advisor_request_duration_seconds",
            "Advisor request duration",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            requests_total,
            request_duration,
            registry,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn outcome_count(&self, outcome: Outcome) -> u64 {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    pub fn duration_samples(&self) -> u64 {
        self.request_duration.get_sample_count()
    }

    /// Text exposition format snapshot of the registry
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| AdvisorError::Config(format!("metrics output is not UTF-8: {e}")))
    }
}

impl MetricsCollector for PrometheusMetrics {
    fn record_outcome(&self, outcome: Outcome) {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    fn observe_duration(&self, seconds: f64) {
        self.request_duration.observe(seconds);
    }
}
