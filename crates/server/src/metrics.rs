//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the transmute server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Sizes of uploads the convert endpoint turned into outputs
//! - Conversion permits currently free (collected dynamically)
//!
//! Core conversion metrics are registered alongside these.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntGauge, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "transmute_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transmute_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "transmute_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Size of successfully converted uploads in bytes.
pub static UPLOAD_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("transmute_upload_bytes", "Size of uploaded files in bytes").buckets(
            vec![
                1024.0,
                16_384.0,
                131_072.0,
                1_048_576.0,
                8_388_608.0,
                33_554_432.0,
                104_857_600.0,
            ],
        ),
        &["converter"],
    )
    .unwrap()
});

/// Conversion permits currently free (collected dynamically).
pub static CONVERSION_PERMITS_AVAILABLE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "transmute_conversion_permits_available",
        "Conversions that could start without waiting",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Conversions
    registry.register(Box::new(UPLOAD_BYTES.clone())).unwrap();
    registry
        .register(Box::new(CONVERSION_PERMITS_AVAILABLE.clone()))
        .unwrap();

    // Core metrics (conversions, durations, strategy fallbacks)
    for metric in transmute_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    CONVERSION_PERMITS_AVAILABLE.set(state.service().available_permits() as i64);
}

static FORMAT_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"^(/api/v1/formats)/[^/]+$").unwrap());

/// Normalize a path for metric labels (replace format names with a placeholder).
pub fn normalize_path(path: &str) -> String {
    FORMAT_SEGMENT.replace(path, "$1/{format}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_format() {
        assert_eq!(normalize_path("/api/v1/formats/png"), "/api/v1/formats/{format}");
        assert_eq!(normalize_path("/api/v1/formats/.PDF"), "/api/v1/formats/{format}");
    }

    #[test]
    fn test_normalize_path_no_placeholders() {
        assert_eq!(normalize_path("/api/v1/formats"), "/api/v1/formats");
        assert_eq!(normalize_path("/api/v1/convert"), "/api/v1/convert");
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("transmute_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        CONVERSION_PERMITS_AVAILABLE.set(4);
        UPLOAD_BYTES.with_label_values(&["image"]).observe(2048.0);
        transmute_core::metrics::CONVERSIONS_TOTAL
            .with_label_values(&["image", "completed"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("transmute_http_requests_in_flight"));
        assert!(output.contains("transmute_conversion_permits_available"));
        assert!(output.contains("transmute_upload_bytes"));
        assert!(output.contains("transmute_conversions_total"));
    }
}
