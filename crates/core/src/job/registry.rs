//! In-memory job registry.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::types::{Job, JobResult, JobStatus};
use crate::fetcher::MediaFormat;
use crate::progress::JobProgress;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with this id (never existed, or already evicted).
    #[error("job not found: {0}")]
    NotFound(String),

    /// The job already reached a terminal state.
    #[error("cannot transition job {job_id}: status is already {status}")]
    InvalidTransition { job_id: String, status: &'static str },
}

/// Data needed to create a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub source_url: String,
    pub format: MediaFormat,
    /// Root under which the job's private working directory is placed.
    pub work_root: PathBuf,
}

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

/// A change applied to a job: a progress update or a terminal transition.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: JobProgress,
}

impl JobEvent {
    fn of(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress.clone(),
        }
    }
}

/// The single owner of job state.
///
/// Every mutation takes the write lock for the duration of a read-check-write
/// on one record, so a progress update can never interleave with a terminal
/// transition. Applied changes are published, in order, to subscribers.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
    events: broadcast::Sender<JobEvent>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            jobs: RwLock::new(HashMap::new()),
            events,
        }
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives every progress update and terminal transition applied from
    /// now on. Events are sent while the record is locked, so they arrive in
    /// the order they were applied.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    fn publish(&self, job: &Job) {
        // No subscribers is fine
        let _ = self.events.send(JobEvent::of(job));
    }

    /// Creates a job in `processing` state with a fresh id.
    pub async fn create(&self, new_job: NewJob) -> Job {
        let id = Uuid::new_v4().simple().to_string();
        let job = Job {
            working_dir: new_job.work_root.join(&id),
            id: id.clone(),
            source_url: new_job.source_url,
            format: new_job.format,
            status: JobStatus::Processing,
            created_at: Utc::now(),
            progress: JobProgress::Starting,
            result: None,
            error_detail: None,
        };

        self.jobs.write().await.insert(id, job.clone());
        debug!("Created job {}", job.id);
        job
    }

    /// Returns a snapshot of a job.
    pub async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Replaces the progress of a processing job.
    ///
    /// Returns `false` if the job is unknown or already terminal; such
    /// updates are dropped.
    pub async fn update_progress(&self, id: &str, progress: JobProgress) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) if job.status == JobStatus::Processing => {
                job.progress = progress;
                self.publish(job);
                true
            }
            _ => false,
        }
    }

    /// Transitions `processing -> completed`.
    pub async fn complete(&self, id: &str, result: JobResult) -> Result<Job, JobError> {
        self.transition(id, |job| {
            job.status = JobStatus::Completed;
            job.result = Some(result);
        })
        .await
    }

    /// Transitions `processing -> error`.
    pub async fn fail(&self, id: &str, detail: impl Into<String>) -> Result<Job, JobError> {
        let detail = detail.into();
        self.transition(id, |job| {
            job.status = JobStatus::Error;
            job.error_detail = Some(detail);
        })
        .await
    }

    async fn transition(
        &self,
        id: &str,
        apply: impl FnOnce(&mut Job),
    ) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if job.status.is_terminal() {
            return Err(JobError::InvalidTransition {
                job_id: id.to_string(),
                status: job.status.as_str(),
            });
        }

        apply(job);
        self.publish(job);
        Ok(job.clone())
    }

    /// Removes a job regardless of state.
    pub async fn remove(&self, id: &str) -> Option<Job> {
        self.jobs.write().await.remove(id)
    }

    /// Removes every job created before `cutoff`, returning the evicted records.
    pub async fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<String> = jobs
            .values()
            .filter(|job| job.created_at < cutoff)
            .map(|job| job.id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| jobs.remove(&id))
            .collect()
    }

    /// Snapshot of all jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
