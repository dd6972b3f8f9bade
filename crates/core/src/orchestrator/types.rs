//! Types for the job orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetcher::{BrowserCookie, MediaFormat, Quality};

/// Errors returned synchronously by [`JobOrchestrator::start_job`].
///
/// Everything that goes wrong after the job is created is recorded on the
/// job instead.
///
/// [`JobOrchestrator::start_job`]: super::JobOrchestrator::start_job
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Missing or malformed request data.
    #[error("{0}")]
    Validation(String),

    /// Could not prepare the job's working directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A request to start a download job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub format: MediaFormat,
    #[serde(default)]
    pub quality: Quality,
    /// Browser session cookies to pass to the fetcher.
    #[serde(default)]
    pub cookies: Option<Vec<BrowserCookie>>,
}

impl StartJobRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: MediaFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<BrowserCookie>) -> Self {
        self.cookies = Some(cookies);
        self
    }
}

/// Counts of tracked jobs by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Checks that `url` is an absolute http(s) URL and returns it trimmed.
pub fn validate_url(url: &str) -> Result<&str, OrchestratorError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(OrchestratorError::Validation("URL is required".to_string()));
    }

    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !url.chars().any(char::is_whitespace) => Ok(url),
        _ => Err(OrchestratorError::Validation(format!(
            "invalid URL: {}",
            url
        ))),
    }
}
