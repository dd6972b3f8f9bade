//! Metadata probe and direct-link handlers. Neither creates a job.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use streamsaver_core::{
    metrics::PROBES_TOTAL, orchestrator::validate_url, FetchError, MediaFormat, MediaInfo,
};
use tracing::{info, warn};

use super::{api_error, ApiError, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a metadata probe
#[derive(Debug, Deserialize)]
pub struct VideoInfoBody {
    #[serde(default)]
    pub url: String,
}

/// Probe result
#[derive(Debug, Serialize)]
pub struct VideoInfoResponse {
    pub success: bool,
    #[serde(flatten)]
    pub info: MediaInfo,
}

/// Query parameters for a direct link
#[derive(Debug, Deserialize)]
pub struct DirectLinkParams {
    pub url: Option<String>,
    #[serde(default)]
    pub format: MediaFormat,
}

/// Direct link result
#[derive(Debug, Serialize)]
pub struct DirectLinkResponse {
    pub success: bool,
    pub url: String,
}

fn fetch_error(err: FetchError) -> ApiError {
    let (status, details) = match &err {
        FetchError::NotInstalled { .. } => (StatusCode::SERVICE_UNAVAILABLE, None),
        FetchError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, None),
        FetchError::ExitFailure { diagnostic, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, diagnostic.clone())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
    };
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: err.to_string(),
            details,
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Title, thumbnail and playlist information for a URL.
pub async fn video_info(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VideoInfoBody>, JsonRejection>,
) -> Result<Json<VideoInfoResponse>, ApiError> {
    let Json(body) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let url = validate_url(&body.url).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.fetcher().probe(url).await {
        Ok(info) => {
            PROBES_TOTAL.with_label_values(&["success"]).inc();
            Ok(Json(VideoInfoResponse {
                success: true,
                info,
            }))
        }
        Err(e) => {
            PROBES_TOTAL.with_label_values(&["failure"]).inc();
            warn!("Probe failed for {}: {}", url, e);
            Err(fetch_error(e))
        }
    }
}

/// Resolves a link the browser can download directly, without a job.
pub async fn direct_link(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DirectLinkParams>,
) -> Result<Json<DirectLinkResponse>, ApiError> {
    let raw = params
        .url
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing URL"))?;
    let url = validate_url(&raw).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    info!("Resolving direct link for {} ({})", url, params.format.extension());
    match state.fetcher().resolve_direct_url(url, params.format).await {
        Ok(link) => Ok(Json(DirectLinkResponse {
            success: true,
            url: link,
        })),
        Err(FetchError::ProbeFailed { .. }) => {
            Err(api_error(StatusCode::NOT_FOUND, "No link found."))
        }
        Err(e) => {
            warn!("Direct link failed for {}: {}", url, e);
            Err(fetch_error(e))
        }
    }
}
