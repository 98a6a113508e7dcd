//! Prometheus metrics for monitoring the public API server.
//!
//! This module provides a centralized metrics registry for tracking requests,
//! latency, image dispatch outcomes and token acquisition.

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint and status
    pub request_count: IntCounterVec,

    /// Request duration histogram in seconds
    pub request_duration: HistogramVec,

    /// Number of currently active requests by endpoint
    pub active_requests: GaugeVec,

    /// Image generate/edit dispatches by endpoint and outcome
    pub image_requests: IntCounterVec,

    /// Token acquisition attempts by pool and outcome
    pub token_acquisitions: IntCounterVec,

    /// Upstream call latency in seconds by operation
    pub upstream_latency: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// This should be called once at application startup. Subsequent calls will
/// return the same instance.
///
/// # Examples
///
/// ```no_run
/// use grok_public_api::core::metrics::init_metrics;
///
/// let metrics = init_metrics();
/// metrics.request_count.with_label_values(&["GET", "/health", "200"]).inc();
/// ```
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "grok_public_requests_total",
            "Total number of requests",
            &["method", "endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "grok_public_request_duration_seconds",
            "Request duration in seconds",
            &["method", "endpoint"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
        )
        .expect("Failed to register request_duration metric");

        let active_requests = register_gauge_vec!(
            "grok_public_active_requests",
            "Number of active requests",
            &["endpoint"]
        )
        .expect("Failed to register active_requests metric");

        let image_requests = register_int_counter_vec!(
            "grok_public_image_requests_total",
            "Image generate/edit dispatches by outcome",
            &["endpoint", "outcome"]
        )
        .expect("Failed to register image_requests metric");

        let token_acquisitions = register_int_counter_vec!(
            "grok_public_token_acquisitions_total",
            "Token acquisition attempts by pool and outcome",
            &["pool", "outcome"]
        )
        .expect("Failed to register token_acquisitions metric");

        let upstream_latency = register_histogram_vec!(
            "grok_public_upstream_latency_seconds",
            "Upstream call latency in seconds",
            &["operation"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
        )
        .expect("Failed to register upstream_latency metric");

        Metrics {
            request_count,
            request_duration,
            active_requests,
            image_requests,
            token_acquisitions,
            upstream_latency,
        }
    })
}

/// Get the global metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
