//! Assembly plan and artifact types.

use std::path::PathBuf;

use crate::job::JobResult;

/// What to do with a working directory, decided from its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyPlan {
    /// Nothing was produced.
    Empty,
    /// Exactly one file: move it unchanged.
    Single(PathBuf),
    /// Two or more entries: zip the whole directory.
    Archive { entries: usize },
}

impl AssemblyPlan {
    pub fn is_archive(&self) -> bool {
        matches!(self, AssemblyPlan::Archive { .. })
    }
}

/// A finished artifact in the public artifacts area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Whether this is a zip of several outputs.
    pub archived: bool,
}

impl Artifact {
    pub fn to_result(&self) -> JobResult {
        JobResult::for_file(self.filename.clone())
    }
}

/// Deterministic archive file name for a job.
pub fn archive_name(job_id: &str) -> String {
    format!("playlist_{}.zip", job_id)
}
