//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Downloader (acquisition attempts, rate limits, source fallbacks)
//! - Providers (calls by outcome, breaker transitions)
//! - Enrichment (duration, confidence)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Downloader - Acquisition Metrics
// =============================================================================

/// Acquisition jobs total by result.
pub static ACQUISITION_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tunedeck_acquisition_attempts_total",
            "Total acquisition jobs",
        ),
        &["result"], // "ok", "tool_missing", "no_songs_processed", ...
    )
    .unwrap()
});

/// Acquisition job duration in seconds.
pub static ACQUISITION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "tunedeck_acquisition_duration_seconds",
            "Duration of one acquisition job",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0, 1800.0]),
    )
    .unwrap()
});

/// Rate-limit cooldowns entered during acquisition.
pub static RATE_LIMIT_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tunedeck_rate_limit_hits_total",
        "Rate-limit cooldowns entered during acquisition",
    )
    .unwrap()
});

/// Extractor source fallbacks.
pub static SOURCE_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tunedeck_source_fallbacks_total",
        "Switches to the alternate extractor tool",
    )
    .unwrap()
});

// =============================================================================
// Providers
// =============================================================================

/// Provider calls by provider and outcome.
pub static PROVIDER_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tunedeck_provider_calls_total", "Metadata provider calls"),
        &["provider", "outcome"], // outcome: "success", "no_data", "rate_limited", ...
    )
    .unwrap()
});

/// Circuit breaker transitions by breaker and new state.
pub static BREAKER_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tunedeck_breaker_transitions_total",
            "Circuit breaker state transitions",
        ),
        &["breaker", "state"], // state: "closed", "open", "half_open"
    )
    .unwrap()
});

// =============================================================================
// Enrichment
// =============================================================================

/// Enrichment run duration in seconds.
pub static ENRICHMENT_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "tunedeck_enrichment_duration_seconds",
            "Duration of one enrichment run",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

/// Confidence of merged enrichment results.
pub static ENRICHMENT_CONFIDENCE: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "tunedeck_enrichment_confidence",
            "Confidence of merged enrichment results",
        )
        .buckets(vec![0.0, 0.2, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Acquisition
        Box::new(ACQUISITION_ATTEMPTS.clone()),
        Box::new(ACQUISITION_DURATION.clone()),
        Box::new(RATE_LIMIT_HITS.clone()),
        Box::new(SOURCE_FALLBACKS.clone()),
        // Providers
        Box::new(PROVIDER_CALLS.clone()),
        Box::new(BREAKER_TRANSITIONS.clone()),
        // Enrichment
        Box::new(ENRICHMENT_DURATION.clone()),
        Box::new(ENRICHMENT_CONFIDENCE.clone()),
    ]
}
