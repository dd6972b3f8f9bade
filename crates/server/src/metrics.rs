//! Prometheus exposition for the server.
//!
//! The registry combines per-request HTTP series with the job lifecycle,
//! retention and probe series defined in the core crate. Job counts by
//! status are sampled from the registry whenever `/metrics` is scraped.

use once_cell::sync::Lazy;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use streamsaver_core::JobStatus;

use crate::state::AppState;

/// Route labels used for request series. Anything else is `unmatched`.
const KNOWN_ROUTES: &[&str] = &[
    "/health",
    "/config",
    "/metrics",
    "/video-info",
    "/download",
    "/start-download",
    "/status",
];

/// Registry scraped by `/metrics`.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();

    let mut collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(JOBS_BY_STATUS.clone()),
    ];
    collectors.extend(streamsaver_core::metrics::all_metrics());

    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

// -----------------------------------------------------------------------------
// HTTP
// -----------------------------------------------------------------------------

/// Handler latency. Job endpoints return before the download runs, so the
/// interesting tail is probes and artifact transfers.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "streamsaver_http_request_duration_seconds",
            "Time spent handling HTTP requests",
        )
        .buckets(vec![0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0]),
        &["method", "route", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("streamsaver_http_requests_total", "HTTP requests handled"),
        &["method", "route", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "streamsaver_http_requests_in_flight",
        "HTTP requests currently being handled",
    )
    .unwrap()
});

// -----------------------------------------------------------------------------
// Jobs
// -----------------------------------------------------------------------------

/// Registry population by status, sampled at scrape time.
pub static JOBS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("streamsaver_jobs_by_status", "Jobs currently held in the registry"),
        &["status"],
    )
    .unwrap()
});

/// Render every registered series in the Prometheus text format.
pub fn encode_metrics() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges that mirror registry state.
pub async fn collect_dynamic_metrics(state: &AppState) {
    let counts = state.orchestrator().status().await;
    for (status, count) in [
        (JobStatus::Processing, counts.processing),
        (JobStatus::Completed, counts.completed),
        (JobStatus::Error, counts.failed),
    ] {
        JOBS_BY_STATUS
            .with_label_values(&[status.as_str()])
            .set(count as i64);
    }
}

/// Route label for a request path.
///
/// Artifact names and unknown paths are collapsed so the label set stays
/// bounded no matter what clients request.
pub fn route_label(path: &str) -> &'static str {
    if path == "/files" || path.starts_with("/files/") {
        return "/files/{name}";
    }
    KNOWN_ROUTES
        .iter()
        .copied()
        .find(|route| *route == path)
        .unwrap_or("unmatched")
}
