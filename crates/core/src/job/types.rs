//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::fetcher::MediaFormat;
use crate::progress::JobProgress;

/// Lifecycle state of a job. Only moves forward, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Returns the status as a string for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// Deliverable of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    /// File name inside the public artifacts area.
    pub filename: String,
    /// Server-relative URL the artifact is served from.
    pub artifact_url: String,
}

impl JobResult {
    /// Builds a result for `filename`, percent-encoding it into the URL.
    pub fn for_file(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let artifact_url = format!("/files/{}", urlencoding::encode(&filename));
        Self {
            filename,
            artifact_url,
        }
    }
}

/// One user-requested download tracked from creation to terminal state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique identifier, never reused.
    pub id: String,
    /// URL the job was created for.
    pub source_url: String,
    /// Requested output format.
    pub format: MediaFormat,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Creation time, used for retention.
    pub created_at: DateTime<Utc>,
    /// Latest progress snapshot.
    pub progress: JobProgress,
    /// Present only when completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    /// Present only on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Job-private directory the fetcher writes into.
    #[serde(skip)]
    pub working_dir: PathBuf,
}
