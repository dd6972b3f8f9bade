//! Job API handlers.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use streamsaver_core::{Job, OrchestratorError, StartJobRequest};
use tracing::error;

use super::{api_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for a started job
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadResponse {
    pub success: bool,
    pub job_id: String,
}

/// Query parameters for the status endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusParams {
    pub job_id: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a download job. Returns as soon as the job exists.
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartJobRequest>, JsonRejection>,
) -> Result<Json<StartDownloadResponse>, ApiError> {
    let Json(request) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    match state.orchestrator().start_job(request).await {
        Ok(job) => Ok(Json(StartDownloadResponse {
            success: true,
            job_id: job.id,
        })),
        Err(OrchestratorError::Validation(msg)) => Err(api_error(StatusCode::BAD_REQUEST, msg)),
        Err(e) => {
            error!("Failed to start job: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Current record of a job.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatusParams>,
) -> Result<Json<Job>, ApiError> {
    let job_id = params
        .job_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "jobId is required"))?;

    state
        .registry()
        .get(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Job not found: {}", job_id)))
}
