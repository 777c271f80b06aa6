//! Observability infrastructure for the risk predictor
//!
//! Provides:
//! - Prometheus metrics (inference latency, prediction outcomes, load time)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Histogram, HistogramVec, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for per-request inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Artifact loading can take seconds for large ONNX graphs
const LOAD_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    inference_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    models_loaded: IntGaugeVec,
    artifact_load_seconds: Histogram,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram_vec!(
                "predictor_inference_latency_seconds",
                "Time spent building features, preprocessing and running a model",
                &["domain"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "predictor_predictions_total",
                "Successful predictions by domain, model and category",
                &["domain", "model", "category"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "predictor_prediction_errors_total",
                "Failed predictions by domain and error kind",
                &["domain", "kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            models_loaded: register_int_gauge_vec!(
                "predictor_models_loaded",
                "Number of models loaded per domain",
                &["domain"]
            )
            .expect("Failed to register models_loaded"),

            artifact_load_seconds: register_histogram!(
                "predictor_artifact_load_seconds",
                "Time spent loading and validating all artifacts",
                LOAD_BUCKETS.to_vec()
            )
            .expect("Failed to register artifact_load_seconds"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying collectors.
#[derive(Clone, Debug)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_inference_latency(&self, domain: &str, duration_secs: f64) {
        self.inner()
            .inference_latency_seconds
            .with_label_values(&[domain])
            .observe(duration_secs);
    }

    pub fn inc_predictions(&self, domain: &str, model: &str, category: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[domain, model, category])
            .inc();
    }

    pub fn inc_prediction_errors(&self, domain: &str, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[domain, kind])
            .inc();
    }

    pub fn set_models_loaded(&self, domain: &str, count: usize) {
        self.inner()
            .models_loaded
            .with_label_values(&[domain])
            .set(count as i64);
    }

    pub fn observe_artifact_load(&self, duration_secs: f64) {
        self.inner().artifact_load_seconds.observe(duration_secs);
    }
}

/// Structured logger for predictor events
///
/// Consistent JSON-formatted events for startup, artifact loading and
/// individual predictions.
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, artifact_root: &str, domains: &[String]) {
        info!(
            event = "predictor_started",
            instance = %self.instance,
            version = %version,
            artifact_root = %artifact_root,
            domains = ?domains,
            "Risk predictor started"
        );
    }

    pub fn log_domain_loaded(&self, domain: &str, models: usize, arity: usize, elapsed_ms: u128) {
        info!(
            event = "domain_loaded",
            instance = %self.instance,
            domain = %domain,
            models = models,
            arity = arity,
            elapsed_ms = elapsed_ms,
            "Loaded domain artifacts"
        );
    }

    pub fn log_prediction(
        &self,
        domain: &str,
        model: &str,
        source: &str,
        category: &str,
        score_kind: &str,
        score: f32,
        elapsed_us: u128,
    ) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            domain = %domain,
            model = %model,
            source = %source,
            category = %category,
            score_kind = %score_kind,
            score = score,
            elapsed_us = elapsed_us,
            "Generated risk prediction"
        );
    }

    pub fn log_prediction_failed(&self, domain: &str, model: &str, kind: &str, details: &str) {
        match kind {
            "model_invocation" => {
                warn!(
                    event = "prediction_failed",
                    instance = %self.instance,
                    domain = %domain,
                    model = %model,
                    kind = %kind,
                    details = %details,
                    "Model invocation failed"
                );
            }
            _ => {
                info!(
                    event = "prediction_rejected",
                    instance = %self.instance,
                    domain = %domain,
                    model = %model,
                    kind = %kind,
                    details = %details,
                    "Prediction request rejected"
                );
            }
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "predictor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Risk predictor shutting down"
        );
    }
}
