//! Orchestrator configuration.

use std::path::PathBuf;

use crate::config::Config;

/// Where the orchestrator keeps per-job state on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Root for per-job working directories and cookie files.
    pub work_dir: PathBuf,

    /// Public artifacts area.
    pub downloads_dir: PathBuf,

    /// How many unread output chunks may queue up per job.
    pub output_buffer: usize,
}

impl OrchestratorConfig {
    pub fn new(work_dir: impl Into<PathBuf>, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            downloads_dir: downloads_dir.into(),
            output_buffer: default_output_buffer(),
        }
    }

    /// Takes the storage paths from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.storage.work_dir, &config.storage.downloads_dir)
    }

    /// Path of the transient cookie file for a job. Lives beside, not
    /// inside, the job's working directory.
    pub fn cookie_path(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(format!("cookies_{}.txt", job_id))
    }
}

fn default_output_buffer() -> usize {
    64
}
