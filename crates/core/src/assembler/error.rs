//! Assembly error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while assembling a job's artifact.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The fetcher exited cleanly but left nothing behind.
    #[error("no output produced")]
    NoOutput,

    /// Relocating the single output file failed.
    #[error("failed to move {source_path} to {destination}: {reason}")]
    Move {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    /// Building the archive failed.
    #[error("archive creation failed: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssemblyError {
    pub fn move_failed(source: PathBuf, destination: PathBuf, err: std::io::Error) -> Self {
        Self::Move {
            source_path: source,
            destination,
            reason: err.to_string(),
        }
    }

    /// Metrics label for this failure.
    pub fn reason_label(&self) -> &'static str {
        match self {
            AssemblyError::NoOutput => "no_output",
            AssemblyError::Move { .. } | AssemblyError::Archive(_) => "assembly",
            AssemblyError::Io(_) => "io",
        }
    }
}

impl From<zip::result::ZipError> for AssemblyError {
    fn from(err: zip::result::ZipError) -> Self {
        AssemblyError::Archive(err.to_string())
    }
}

impl From<walkdir::Error> for AssemblyError {
    fn from(err: walkdir::Error) -> Self {
        AssemblyError::Archive(err.to_string())
    }
}
