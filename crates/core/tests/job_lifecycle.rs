//! Job lifecycle integration tests.
//!
//! These tests drive jobs through the orchestrator end to end:
//! start -> processing (progress) -> assembly -> completed | error -> retention

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tempfile::TempDir;

use streamsaver_core::{
    testing::{fixtures, FetchScript, MockFetcher},
    Fetcher, Job, JobOrchestrator, JobProgress, JobRegistry, JobStatus, MediaFormat,
    OrchestratorConfig, OrchestratorError, RetentionConfig, RetentionSweeper, StartJobRequest,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Test helper wiring a mock fetcher, registry and orchestrator over a
/// temporary directory tree.
struct TestHarness {
    fetcher: Arc<MockFetcher>,
    registry: Arc<JobRegistry>,
    orchestrator: JobOrchestrator,
    downloads_dir: PathBuf,
    work_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let fetcher = Arc::new(MockFetcher::new());
        Self::with_fetcher(Arc::clone(&fetcher) as Arc<dyn Fetcher>, fetcher)
    }

    fn with_fetcher(fetcher: Arc<dyn Fetcher>, mock: Arc<MockFetcher>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloads_dir = temp_dir.path().join("downloads");
        let work_dir = temp_dir.path().join("work");
        std::fs::create_dir_all(&downloads_dir).unwrap();

        let registry = Arc::new(JobRegistry::new());
        let orchestrator = JobOrchestrator::new(
            OrchestratorConfig::new(&work_dir, &downloads_dir),
            fetcher,
            Arc::clone(&registry),
        );

        Self {
            fetcher: mock,
            registry,
            orchestrator,
            downloads_dir,
            work_dir,
            _temp_dir: temp_dir,
        }
    }

    async fn start(&self, request: StartJobRequest) -> Job {
        self.orchestrator
            .start_job(request)
            .await
            .expect("start_job should accept the request")
    }

    /// Polls until `predicate` holds for the job, returning the snapshot.
    async fn wait_until(&self, job_id: &str, predicate: impl Fn(&Job) -> bool) -> Job {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        while start.elapsed() < TIMEOUT {
            if let Some(job) = self.registry.get(job_id).await {
                if predicate(&job) {
                    return job;
                }
            }
            tokio::time::sleep(poll_interval).await;
        }

        panic!(
            "Timed out waiting for job {}: {:?}",
            job_id,
            self.registry.get(job_id).await
        );
    }

    async fn wait_terminal(&self, job_id: &str) -> Job {
        self.wait_until(job_id, |job| job.status.is_terminal()).await
    }

    async fn wait_progress(&self, job_id: &str, expected: JobProgress) -> Job {
        self.wait_until(job_id, move |job| job.progress == expected)
            .await
    }

    fn cookie_path(&self, job_id: &str) -> PathBuf {
        self.orchestrator.config().cookie_path(job_id)
    }
}

fn playlist_position(index: u32, count: u32) -> JobProgress {
    JobProgress::Playlist {
        current_index: index,
        total_count: count,
        speed: Some("1.50MB/s".to_string()),
        eta: Some("00:01".to_string()),
    }
}

fn assert_no_working_dir(job: &Job) {
    assert!(
        !job.working_dir.exists(),
        "working directory {:?} should be gone",
        job.working_dir
    );
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_single_video_mp4_completes() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(fixtures::single_video_script("Some Clip.mp4"))
        .await;

    let job = harness
        .start(StartJobRequest::new("https://www.youtube.com/watch?v=abc123"))
        .await;
    assert_eq!(job.status, JobStatus::Processing);

    // Progress is visible before the fetcher finishes.
    let running = harness
        .wait_until(&job.id, |job| {
            matches!(job.progress, JobProgress::Downloading { percent, .. } if percent == 25.0)
        })
        .await;
    assert_eq!(running.status, JobStatus::Processing);
    match &running.progress {
        JobProgress::Downloading {
            total_size, speed, ..
        } => {
            assert_eq!(total_size, "10.00MB");
            assert_eq!(speed.as_deref(), Some("1.00MB/s"));
        }
        other => panic!("unexpected progress: {:?}", other),
    }
    assert!(running.working_dir.exists());

    harness.fetcher.release(1);
    let done = harness.wait_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Completed);
    let result = done.result.clone().unwrap();
    assert_eq!(result.filename, "Some Clip.mp4");
    assert_eq!(result.artifact_url, "/files/Some%20Clip.mp4");
    assert!(harness.downloads_dir.join("Some Clip.mp4").is_file());
    assert!(done.error_detail.is_none());
    assert_no_working_dir(&done);
}

#[tokio::test]
async fn test_audio_request_produces_mp3() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().file("Song.mp3", b"audio".to_vec()))
        .await;

    let job = harness
        .start(StartJobRequest::new("https://example.com/song").with_format(MediaFormat::Mp3))
        .await;
    let done = harness.wait_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.result.unwrap().filename.ends_with(".mp3"));

    let launches = harness.fetcher.recorded_launches().await;
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].request.format, MediaFormat::Mp3);
    assert_eq!(launches[0].request.output_dir, job.working_dir);
}

#[tokio::test]
async fn test_playlist_progress_then_archive() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(fixtures::playlist_script(3, "mp4"))
        .await;
    let mut events = harness.registry.subscribe();

    let job = harness
        .start(StartJobRequest::new(
            "https://www.youtube.com/playlist?list=PL123",
        ))
        .await;

    for index in 1..=3 {
        let snapshot = harness
            .wait_progress(&job.id, playlist_position(index, 3))
            .await;
        assert_eq!(snapshot.status, JobStatus::Processing);
        harness.fetcher.release(1);
    }

    let done = harness.wait_terminal(&job.id).await;
    assert_eq!(done.status, JobStatus::Completed);

    let result = done.result.clone().unwrap();
    assert_eq!(result.filename, format!("playlist_{}.zip", job.id));
    assert!(result.filename.ends_with(".zip"));

    let archive_path = harness.downloads_dir.join(&result.filename);
    let archive = zip::ZipArchive::new(std::fs::File::open(&archive_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 3);
    assert_no_working_dir(&done);

    // Every stage the job went through, in the order it was applied
    let mut stages = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.job_id == job.id {
            stages.push((event.status, event.progress));
        }
    }
    let last_position = stages
        .iter()
        .rposition(|(_, p)| *p == playlist_position(3, 3))
        .expect("position 3/3 was reported");
    let compressing = stages
        .iter()
        .position(|(_, p)| *p == JobProgress::Compressing)
        .expect("compressing was reported");
    assert!(compressing > last_position);
    assert_eq!(stages[compressing].0, JobStatus::Processing);
    assert_eq!(stages.len(), compressing + 2);
    assert_eq!(stages[compressing + 1].0, JobStatus::Completed);
}

#[tokio::test]
async fn test_single_file_job_never_reports_compressing() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().file("one.mp4", b"x".to_vec()))
        .await;
    let mut events = harness.registry.subscribe();

    let job = harness
        .start(StartJobRequest::new("https://example.com/one"))
        .await;
    assert_eq!(
        harness.wait_terminal(&job.id).await.status,
        JobStatus::Completed
    );

    while let Ok(event) = events.try_recv() {
        assert_ne!(event.progress, JobProgress::Compressing);
    }
}

#[tokio::test]
async fn test_missing_fetcher_fails_job_not_request() {
    let harness = TestHarness::new();
    harness.fetcher.set_not_installed(true).await;

    let job = harness
        .start(StartJobRequest::new("https://example.com/v"))
        .await;
    let done = harness.wait_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Error);
    let detail = done.error_detail.clone().unwrap();
    assert!(detail.contains("not installed"), "detail: {}", detail);
    assert!(done.result.is_none());
    assert_no_working_dir(&done);
}

#[tokio::test]
async fn test_retention_evicts_job_and_artifact() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().file("old.mp4", b"x".to_vec()))
        .await;

    let job = harness
        .start(StartJobRequest::new("https://example.com/old"))
        .await;
    let done = harness.wait_terminal(&job.id).await;
    let artifact = harness
        .downloads_dir
        .join(done.result.unwrap().filename);
    assert!(artifact.exists());

    let sweeper = RetentionSweeper::new(
        Arc::clone(&harness.registry),
        &harness.downloads_dir,
        &RetentionConfig {
            max_age_secs: 3600,
            sweep_interval_secs: 600,
        },
    );

    // Inside the window nothing changes.
    let report = sweeper.sweep_once(Utc::now()).await;
    assert_eq!(report.jobs_evicted, 0);
    assert!(harness.registry.get(&job.id).await.is_some());

    let report = sweeper
        .sweep_once(Utc::now() + TimeDelta::hours(2))
        .await;
    assert_eq!(report.jobs_evicted, 1);
    assert_eq!(report.files_removed, 1);
    assert!(harness.registry.get(&job.id).await.is_none());
    assert!(!artifact.exists());
    // Scratch space lives outside the artifacts area and is untouched.
    assert!(harness.work_dir.exists());
}

// =============================================================================
// Failure paths and invariants
// =============================================================================

#[tokio::test]
async fn test_nonzero_exit_is_extraction_error() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(
            FetchScript::new()
                .output(fixtures::download_line(10.0, "1.00MiB", "1.00MiB/s", "00:01"))
                .file("partial.mp4.part", b"x".to_vec())
                .exit_with(1),
        )
        .await;

    let job = harness
        .start(StartJobRequest::new("https://example.com/private"))
        .await;
    let done = harness.wait_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Error);
    assert!(done
        .error_detail
        .as_ref()
        .unwrap()
        .starts_with("extraction failed"));
    assert_no_working_dir(&done);
    assert!(!harness.downloads_dir.join("partial.mp4.part").exists());
}

#[tokio::test]
async fn test_success_without_files_is_no_output() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().output("[info] nothing to do\n"))
        .await;

    let job = harness
        .start(StartJobRequest::new("https://example.com/empty"))
        .await;
    let done = harness.wait_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Error);
    assert_eq!(done.error_detail.as_deref(), Some("no output produced"));
    assert_no_working_dir(&done);
}

#[tokio::test]
async fn test_invalid_url_rejected_synchronously() {
    let harness = TestHarness::new();

    for url in ["", "   ", "not a url", "file:///etc/passwd"] {
        let result = harness.orchestrator.start_job(StartJobRequest::new(url)).await;
        assert!(
            matches!(result, Err(OrchestratorError::Validation(_))),
            "url {:?} should be rejected",
            url
        );
    }

    assert!(harness.registry.is_empty().await);
    assert_eq!(harness.fetcher.launch_count().await, 0);
}

#[tokio::test]
async fn test_unusable_work_root_is_io_error() {
    let harness = TestHarness::new();
    // A regular file where the work root should be
    std::fs::write(&harness.work_dir, b"not a directory").unwrap();

    let result = harness
        .orchestrator
        .start_job(StartJobRequest::new("https://example.com/v"))
        .await;

    assert!(matches!(result, Err(OrchestratorError::Io(_))));
    assert!(harness.registry.is_empty().await);
    assert_eq!(harness.fetcher.launch_count().await, 0);
}

#[tokio::test]
async fn test_cookie_file_removed_after_success() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().file("members.mp4", b"x".to_vec()))
        .await;

    let job = harness
        .start(
            StartJobRequest::new("https://example.com/members")
                .with_cookies(vec![fixtures::browser_cookie("SID", "secret")]),
        )
        .await;
    let done = harness.wait_terminal(&job.id).await;
    assert_eq!(done.status, JobStatus::Completed);

    let launches = harness.fetcher.recorded_launches().await;
    let cookie_file = launches[0].request.cookie_file.clone().unwrap();
    assert_eq!(cookie_file, harness.cookie_path(&job.id));
    assert!(!cookie_file.starts_with(&job.working_dir));

    let contents = launches[0].cookie_contents.clone().unwrap();
    assert!(contents.starts_with("# Netscape HTTP Cookie File"));
    assert!(contents.contains(".example.com\tTRUE\t/\tTRUE\t1900000000\tSID\tsecret"));

    assert!(!cookie_file.exists());
}

#[tokio::test]
async fn test_cookie_file_removed_after_failure() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().exit_with(1))
        .await;

    let job = harness
        .start(
            StartJobRequest::new("https://example.com/members")
                .with_cookies(vec![fixtures::browser_cookie("SID", "secret")]),
        )
        .await;
    let done = harness.wait_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Error);
    assert!(!harness.cookie_path(&job.id).exists());
}

#[tokio::test]
async fn test_empty_cookie_list_writes_no_file() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().file("a.mp4", b"x".to_vec()))
        .await;

    let job = harness
        .start(StartJobRequest::new("https://example.com/a").with_cookies(Vec::new()))
        .await;
    harness.wait_terminal(&job.id).await;

    let launches = harness.fetcher.recorded_launches().await;
    assert!(launches[0].request.cookie_file.is_none());
}

#[tokio::test]
async fn test_duplicate_urls_are_independent_jobs() {
    let harness = TestHarness::new();
    let url = "https://example.com/same";

    harness
        .fetcher
        .set_script(FetchScript::new().file("Intro.mp4", b"first job".to_vec()))
        .await;
    let first = harness.start(StartJobRequest::new(url)).await;
    let first_done = harness.wait_terminal(&first.id).await;

    harness
        .fetcher
        .set_script(FetchScript::new().file("Intro.mp4", b"second job".to_vec()))
        .await;
    let second = harness.start(StartJobRequest::new(url)).await;
    let second_done = harness.wait_terminal(&second.id).await;

    assert_ne!(first.id, second.id);
    assert_ne!(first.working_dir, second.working_dir);
    assert_eq!(first_done.status, JobStatus::Completed);
    assert_eq!(second_done.status, JobStatus::Completed);
    assert_eq!(harness.fetcher.launch_count().await, 2);

    let first_result = first_done.result.unwrap();
    let second_result = second_done.result.unwrap();
    assert_eq!(first_result.filename, "Intro.mp4");
    assert_eq!(second_result.filename, format!("Intro_{}.mp4", second.id));
    assert_ne!(first_result.artifact_url, second_result.artifact_url);

    // Each artifact still holds its own job's bytes
    assert_eq!(
        std::fs::read(harness.downloads_dir.join(&first_result.filename)).unwrap(),
        b"first job"
    );
    assert_eq!(
        std::fs::read(harness.downloads_dir.join(&second_result.filename)).unwrap(),
        b"second job"
    );
}

#[tokio::test]
async fn test_evicted_running_job_still_cleans_up() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(
            FetchScript::new()
                .output(fixtures::download_line(5.0, "1.00MiB", "1.00MiB/s", "00:10"))
                .gate()
                .file("late.mp4", b"x".to_vec()),
        )
        .await;

    let job = harness
        .start(StartJobRequest::new("https://example.com/slow"))
        .await;
    harness
        .wait_until(&job.id, |job| {
            matches!(job.progress, JobProgress::Downloading { .. })
        })
        .await;

    let evicted = harness
        .registry
        .evict_older_than(Utc::now() + TimeDelta::seconds(1))
        .await;
    assert_eq!(evicted.len(), 1);

    harness.fetcher.release(1);

    // The supervising task finishes on its own and removes its scratch space.
    let start = std::time::Instant::now();
    while job.working_dir.exists() && start.elapsed() < TIMEOUT {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!job.working_dir.exists());
    assert!(harness.registry.get(&job.id).await.is_none());
}

#[tokio::test]
async fn test_status_counts() {
    let harness = TestHarness::new();
    harness
        .fetcher
        .set_script(FetchScript::new().file("a.mp4", b"x".to_vec()))
        .await;
    let ok = harness.start(StartJobRequest::new("https://example.com/a")).await;
    harness.wait_terminal(&ok.id).await;

    harness.fetcher.set_not_installed(true).await;
    let bad = harness.start(StartJobRequest::new("https://example.com/b")).await;
    harness.wait_terminal(&bad.id).await;

    let status = harness.orchestrator.status().await;
    assert_eq!(status.completed, 1);
    assert_eq!(status.failed, 1);
    assert_eq!(status.processing, 0);
}

// =============================================================================
// Real process supervision against a stand-in executable
// =============================================================================

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
async fn test_ytdlp_fetcher_with_stand_in_script() {
    use streamsaver_core::{FetcherConfig, YtDlpFetcher};

    let bin_dir = TempDir::new().unwrap();

    // Success: progress on stdout, a benign warning on stderr, one file in
    // the working directory (the process runs with it as cwd).
    let ok_script = write_script(
        bin_dir.path(),
        "fake-ytdlp-ok",
        "printf '[download]  50.0%% of 1.00MiB at 1.00MiB/s ETA 00:01\\n'\n\
         echo 'WARNING: benign notice' >&2\n\
         printf 'data' > 'fake video.mp4'\n\
         printf '[download] 100%% of 1.00MiB in 00:00:01\\n'\n\
         exit 0\n",
    );
    let fetcher = Arc::new(YtDlpFetcher::new(FetcherConfig::with_path(ok_script)));
    let harness = TestHarness::with_fetcher(fetcher, Arc::new(MockFetcher::new()));

    let job = harness
        .start(StartJobRequest::new("https://example.com/v"))
        .await;
    let done = harness.wait_terminal(&job.id).await;
    assert_eq!(done.status, JobStatus::Completed, "{:?}", done.error_detail);
    assert_eq!(done.result.unwrap().filename, "fake video.mp4");
    assert!(matches!(
        done.progress,
        JobProgress::Downloading { percent, .. } if percent == 100.0
    ));

    // Failure: an explicit error marker and a non-zero exit.
    let fail_script = write_script(
        bin_dir.path(),
        "fake-ytdlp-fail",
        "echo 'ERROR: [youtube] abc: Private video' >&2\nexit 1\n",
    );
    let fetcher = Arc::new(YtDlpFetcher::new(FetcherConfig::with_path(fail_script)));
    let harness = TestHarness::with_fetcher(fetcher, Arc::new(MockFetcher::new()));

    let job = harness
        .start(StartJobRequest::new("https://example.com/private"))
        .await;
    let done = harness.wait_terminal(&job.id).await;
    assert_eq!(done.status, JobStatus::Error);
    assert_eq!(
        done.error_detail.as_deref(),
        Some("extraction failed: unsupported or private content (exit code 1)")
    );
    assert_no_working_dir(&done);
}

#[tokio::test]
async fn test_ytdlp_fetcher_missing_binary() {
    use streamsaver_core::{FetcherConfig, YtDlpFetcher};

    let fetcher = Arc::new(YtDlpFetcher::new(FetcherConfig::with_path(PathBuf::from(
        "/nonexistent/streamsaver/yt-dlp",
    ))));
    let harness = TestHarness::with_fetcher(fetcher, Arc::new(MockFetcher::new()));

    let job = harness
        .start(StartJobRequest::new("https://example.com/v"))
        .await;
    let done = harness.wait_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Error);
    assert!(done.error_detail.unwrap().contains("not installed"));
}
