//! Job orchestrator implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::assembler::{Artifact, AssemblyError, ResultAssembler};
use crate::fetcher::{BrowserCookie, CookieFile, FetchError, FetchRequest, Fetcher};
use crate::job::{Job, JobError, JobRegistry, JobStatus, NewJob};
use crate::metrics;
use crate::progress::{JobProgress, ProgressTracker};

use super::config::OrchestratorConfig;
use super::types::{validate_url, OrchestratorError, OrchestratorStatus, StartJobRequest};

/// Why a job ended in `error`. The display text becomes the job's
/// `errorDetail`.
#[derive(Debug, Error)]
enum JobFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("failed to prepare credentials: {0}")]
    Credentials(std::io::Error),
}

impl JobFailure {
    fn reason_label(&self) -> &'static str {
        match self {
            JobFailure::Fetch(e) if e.is_launch_failure() => "launch",
            JobFailure::Fetch(_) => "extraction",
            JobFailure::Assembly(e) => e.reason_label(),
            JobFailure::Credentials(_) => "io",
        }
    }
}

/// Everything a supervising task needs. Cloned into each spawned task.
#[derive(Clone)]
struct JobContext {
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<JobRegistry>,
    assembler: ResultAssembler,
    config: OrchestratorConfig,
}

/// Starts jobs and supervises them to completion.
pub struct JobOrchestrator {
    ctx: JobContext,
}

impl JobOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        let assembler = ResultAssembler::new(&config.downloads_dir);
        Self {
            ctx: JobContext {
                fetcher,
                registry,
                assembler,
                config,
            },
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.ctx.registry
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.ctx.fetcher
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.ctx.config
    }

    /// Validates the request, creates a job and its working directory, and
    /// spawns the supervising task. Returns without waiting for the fetcher.
    pub async fn start_job(&self, request: StartJobRequest) -> Result<Job, OrchestratorError> {
        let url = validate_url(&request.url)?.to_string();

        fs::create_dir_all(&self.ctx.config.work_dir).await?;

        let job = self
            .ctx
            .registry
            .create(NewJob {
                source_url: url.clone(),
                format: request.format,
                work_root: self.ctx.config.work_dir.clone(),
            })
            .await;

        if let Err(e) = fs::create_dir_all(&job.working_dir).await {
            self.ctx.registry.remove(&job.id).await;
            return Err(e.into());
        }

        info!(
            "Started job {} for {} ({}, {:?})",
            job.id,
            url,
            request.format.extension(),
            request.quality
        );
        metrics::JOBS_STARTED.inc();

        let fetch_request = FetchRequest {
            url,
            format: request.format,
            quality: request.quality,
            output_dir: job.working_dir.clone(),
            cookie_file: None,
        };
        tokio::spawn(run_job(
            self.ctx.clone(),
            job.clone(),
            fetch_request,
            request.cookies.unwrap_or_default(),
        ));

        Ok(job)
    }

    /// Counts tracked jobs by status.
    pub async fn status(&self) -> OrchestratorStatus {
        let mut status = OrchestratorStatus::default();
        for job in self.ctx.registry.list().await {
            match job.status {
                JobStatus::Processing => status.processing += 1,
                JobStatus::Completed => status.completed += 1,
                JobStatus::Error => status.failed += 1,
            }
        }
        status
    }
}

/// Supervises one job from launch to its terminal transition.
async fn run_job(
    ctx: JobContext,
    job: Job,
    request: FetchRequest,
    cookies: Vec<BrowserCookie>,
) {
    metrics::JOBS_IN_FLIGHT.inc();
    let started = Instant::now();

    let outcome = supervise(&ctx, &job, request, cookies).await;

    // Gone before the job turns terminal, whatever the outcome.
    remove_working_dir(&job.working_dir).await;

    let result_label = match outcome {
        Ok(artifact) => {
            let kind = if artifact.archived {
                "archive"
            } else {
                "single"
            };
            match ctx.registry.complete(&job.id, artifact.to_result()).await {
                Ok(_) => {
                    info!("Job {} completed: {}", job.id, artifact.filename);
                    metrics::JOBS_COMPLETED.with_label_values(&[kind]).inc();
                }
                Err(e) => record_lost_transition(&job.id, e),
            }
            "completed"
        }
        Err(failure) => {
            error!("Job {} failed: {}", job.id, failure);
            metrics::JOBS_FAILED
                .with_label_values(&[failure.reason_label()])
                .inc();
            if let Err(e) = ctx.registry.fail(&job.id, failure.to_string()).await {
                record_lost_transition(&job.id, e);
            }
            "error"
        }
    };

    metrics::JOBS_IN_FLIGHT.dec();
    metrics::JOB_DURATION
        .with_label_values(&[result_label])
        .observe(started.elapsed().as_secs_f64());
}

async fn supervise(
    ctx: &JobContext,
    job: &Job,
    mut request: FetchRequest,
    cookies: Vec<BrowserCookie>,
) -> Result<Artifact, JobFailure> {
    // Dropping the guard deletes the file, so every early return below
    // cleans it up too.
    let cookie_file = if cookies.is_empty() {
        None
    } else {
        let file = CookieFile::write(ctx.config.cookie_path(&job.id), &cookies)
            .await
            .map_err(JobFailure::Credentials)?;
        request.cookie_file = Some(file.path().to_path_buf());
        Some(file)
    };

    let mut handle = ctx.fetcher.launch(request).await?;
    debug!("Fetcher {} launched for job {}", ctx.fetcher.name(), job.id);

    let mut tracker = ProgressTracker::new();
    while let Some(chunk) = handle.next_chunk().await {
        for progress in tracker.feed(&chunk) {
            ctx.registry.update_progress(&job.id, progress).await;
        }
    }
    if let Some(progress) = tracker.finish() {
        ctx.registry.update_progress(&job.id, progress).await;
    }

    let outcome = handle.wait().await;
    drop(cookie_file);
    outcome?;

    let plan = ctx.assembler.plan(&job.working_dir).await?;
    if plan.is_archive() {
        ctx.registry
            .update_progress(&job.id, JobProgress::Compressing)
            .await;
    }

    Ok(ctx
        .assembler
        .execute(&job.id, &job.working_dir, plan)
        .await?)
}

fn record_lost_transition(job_id: &str, err: JobError) {
    match err {
        JobError::NotFound(_) => {
            warn!("Job {} was evicted before it finished", job_id)
        }
        other => warn!("Job {} terminal transition rejected: {}", job_id, other),
    }
}

async fn remove_working_dir(dir: &Path) {
    match fs::remove_dir_all(dir).await {
        Ok(()) => debug!("Removed working directory {:?}", dir),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove working directory {:?}: {}", dir, e),
    }
}
