//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job lifecycle (started, completed, failed, duration, in flight)
//! - Retention (evicted job records, swept artifact files)
//! - Fetcher probes
//!
//! The statics are not registered anywhere here; the server collects them
//! through [`all_metrics`] into its own registry.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Job Lifecycle Metrics
// =============================================================================

/// Jobs started total.
pub static JOBS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("streamsaver_jobs_started_total", "Total jobs started").unwrap()
});

/// Jobs completed total by artifact kind.
pub static JOBS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "streamsaver_jobs_completed_total",
            "Total jobs completed successfully",
        ),
        &["kind"], // "single", "archive"
    )
    .unwrap()
});

/// Jobs failed total by reason.
pub static JOBS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streamsaver_jobs_failed_total", "Total jobs failed"),
        &["reason"], // "launch", "extraction", "no_output", "assembly", "io"
    )
    .unwrap()
});

/// Job duration from creation to terminal state.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "streamsaver_job_duration_seconds",
            "Duration of a job from start to terminal state",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]),
        &["result"],
    )
    .unwrap()
});

/// Jobs whose fetcher process is currently being supervised.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "streamsaver_jobs_in_flight",
        "Number of jobs currently being supervised",
    )
    .unwrap()
});

// =============================================================================
// Retention Metrics
// =============================================================================

/// Job records evicted by the retention sweeper.
pub static JOBS_EVICTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "streamsaver_jobs_evicted_total",
        "Total job records evicted by retention",
    )
    .unwrap()
});

/// Artifact files deleted by the retention sweeper.
pub static ARTIFACTS_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "streamsaver_artifacts_swept_total",
        "Total artifact files deleted by retention",
    )
    .unwrap()
});

// =============================================================================
// Fetcher Metrics
// =============================================================================

/// Metadata probes by result.
pub static PROBES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streamsaver_probes_total", "Total media info probes"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_FAILED.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(JOBS_IN_FLIGHT.clone()),
        // Retention
        Box::new(JOBS_EVICTED.clone()),
        Box::new(ARTIFACTS_SWEPT.clone()),
        // Fetcher
        Box::new(PROBES_TOTAL.clone()),
    ]
}
