//! Retention sweeper implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::fs;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::RetentionConfig;
use crate::job::{JobRegistry, JobStatus};
use crate::metrics;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Job records removed from the registry.
    pub jobs_evicted: usize,
    /// Of those, how many were still processing.
    pub processing_evicted: usize,
    /// Artifact files deleted.
    pub files_removed: usize,
    /// Files that could not be inspected or deleted.
    pub errors: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.jobs_evicted == 0 && self.files_removed == 0 && self.errors == 0
    }
}

/// What a sweep touches. Cloned into the background task.
#[derive(Debug, Clone)]
struct SweepTarget {
    registry: Arc<JobRegistry>,
    artifacts_dir: PathBuf,
    max_age: TimeDelta,
}

impl SweepTarget {
    async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let cutoff = now
            .checked_sub_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut report = SweepReport::default();

        // Records. Evicting a processing job does not stop its process.
        for job in self.registry.evict_older_than(cutoff).await {
            report.jobs_evicted += 1;
            if job.status == JobStatus::Processing {
                report.processing_evicted += 1;
                warn!(
                    "Evicted job {} while still processing; its fetcher keeps running",
                    job.id
                );
            } else {
                debug!("Evicted job {} ({})", job.id, job.status.as_str());
            }
        }

        // Files.
        match fs::read_dir(&self.artifacts_dir).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        match remove_if_expired(&entry.path(), cutoff).await {
                            Ok(true) => report.files_removed += 1,
                            Ok(false) => {}
                            Err(e) => {
                                warn!("Failed to sweep {:?}: {}", entry.path(), e);
                                report.errors += 1;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to list {:?}: {}", self.artifacts_dir, e);
                        report.errors += 1;
                        break;
                    }
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to read artifacts dir {:?}: {}", self.artifacts_dir, e);
                report.errors += 1;
            }
        }

        metrics::JOBS_EVICTED.inc_by(report.jobs_evicted as u64);
        metrics::ARTIFACTS_SWEPT.inc_by(report.files_removed as u64);
        report
    }
}

/// Deletes `path` if it is a regular file last modified before `cutoff`.
async fn remove_if_expired(path: &Path, cutoff: DateTime<Utc>) -> std::io::Result<bool> {
    let meta = fs::symlink_metadata(path).await?;
    if !meta.file_type().is_file() {
        return Ok(false);
    }

    let modified: DateTime<Utc> = meta.modified()?.into();
    if modified >= cutoff {
        return Ok(false);
    }

    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed expired artifact {:?}", path);
            Ok(true)
        }
        // Raced with another cleanup.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Evicts aged job records and deletes aged artifact files on a fixed period.
pub struct RetentionSweeper {
    target: SweepTarget,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RetentionSweeper {
    pub fn new(
        registry: Arc<JobRegistry>,
        artifacts_dir: impl Into<PathBuf>,
        config: &RetentionConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let max_age = i64::try_from(config.max_age_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        Self {
            target: SweepTarget {
                registry,
                artifacts_dir: artifacts_dir.into(),
                max_age,
            },
            interval: Duration::from_secs(config.sweep_interval_secs),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Runs one sweep as of `now`.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        self.target.sweep(now).await
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the periodic sweep loop. The first sweep runs immediately.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Retention sweeper already running");
            return;
        }

        info!(
            "Starting retention sweeper (every {:?}, max age {}s)",
            self.interval,
            self.target.max_age.num_seconds()
        );

        let target = self.target.clone();
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Retention sweeper received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        let report = target.sweep(Utc::now()).await;
                        if !report.is_empty() {
                            info!(
                                "Retention sweep: {} jobs evicted, {} files removed, {} errors",
                                report.jobs_evicted, report.files_removed, report.errors
                            );
                        }
                    }
                }
            }
        });
    }

    /// Stops the sweep loop.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Retention sweeper not running");
            return;
        }

        info!("Stopping retention sweeper");
        let _ = self.shutdown_tx.send(());
    }
}
