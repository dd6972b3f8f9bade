//! Error types for the fetcher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the external fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetcher binary could not be found or started.
    #[error("yt-dlp is not installed or could not be started ({path})")]
    NotInstalled { path: PathBuf },

    /// The fetcher ran and exited unsuccessfully.
    #[error(
        "extraction failed: unsupported or private content (exit code {})",
        .code.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    ExitFailure {
        code: Option<i32>,
        diagnostic: Option<String>,
    },

    /// A metadata probe produced unusable output.
    #[error("failed to read media info: {reason}")]
    ProbeFailed { reason: String },

    /// A probe or link resolution did not finish in time.
    #[error("yt-dlp timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while talking to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Creates a probe failure.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Whether the failure happened before the process ran at all.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::NotInstalled { .. })
    }
}
