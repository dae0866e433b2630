//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (outcome counts and durations per converter)
//! - Strategy fallbacks (engine absent, next strategy tried)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

/// Conversions total by converter and outcome.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transmute_conversions_total", "Total conversion requests"),
        &["converter", "outcome"], // outcome: "completed" or an error kind
    )
    .unwrap()
});

/// Conversion duration in seconds (executing stage only).
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "transmute_conversion_duration_seconds",
            "Duration of the converter call",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["converter"],
    )
    .unwrap()
});

/// Fallbacks taken because an engine was not installed.
pub static STRATEGY_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "transmute_strategy_fallbacks_total",
            "Strategies skipped because their engine was absent",
        ),
        &["routine", "engine"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(STRATEGY_FALLBACKS.clone()),
    ]
}
