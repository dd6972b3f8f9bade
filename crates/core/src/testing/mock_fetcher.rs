//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};

use crate::fetcher::{
    fetch_channel, FetchError, FetchHandle, FetchRequest, Fetcher, MediaFormat, MediaInfo,
};

/// One step of a scripted fetcher run.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a raw stdout chunk.
    Output(String),
    /// Create a file in the job's working directory.
    File { name: String, contents: Vec<u8> },
    /// Sleep before the next step.
    Pause(Duration),
    /// Block until the test calls [`MockFetcher::release`].
    Gate,
}

/// How a scripted run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockOutcome {
    #[default]
    Success,
    /// Non-zero exit with this code.
    Exit(i32),
}

/// A complete scripted run.
#[derive(Debug, Clone, Default)]
pub struct FetchScript {
    pub steps: Vec<ScriptStep>,
    pub outcome: MockOutcome,
}

impl FetchScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, text: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Output(text.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.steps.push(ScriptStep::File {
            name: name.into(),
            contents: contents.into(),
        });
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Pause(duration));
        self
    }

    pub fn gate(mut self) -> Self {
        self.steps.push(ScriptStep::Gate);
        self
    }

    pub fn exit_with(mut self, code: i32) -> Self {
        self.outcome = MockOutcome::Exit(code);
        self
    }
}

/// A recorded launch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    /// The request that was submitted.
    pub request: FetchRequest,
    /// Contents of the cookie file at launch time, if one was passed.
    pub cookie_contents: Option<String>,
}

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Script output chunks, produced files and the exit outcome
/// - Pause a run at gates until the test releases it
/// - Simulate a missing executable
/// - Control probe and direct-link results
///
/// # Example
///
/// ```rust,ignore
/// use streamsaver_core::testing::{FetchScript, MockFetcher};
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_script(
///     FetchScript::new()
///         .output("[download]  50.0% of 10.00MiB at 1.00MiB/s ETA 00:05\n")
///         .gate()
///         .file("video.mp4", b"data".to_vec()),
/// ).await;
///
/// // ... start a job, observe progress ...
/// fetcher.release(1);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    /// Script played by every launch.
    script: Arc<RwLock<FetchScript>>,
    /// Recorded launches.
    launches: Arc<RwLock<Vec<RecordedLaunch>>>,
    /// Whether launch fails as if the binary were missing.
    not_installed: Arc<RwLock<bool>>,
    /// Pre-configured probe results by URL.
    probe_results: Arc<RwLock<HashMap<String, MediaInfo>>>,
    /// Pre-configured direct links by URL.
    direct_urls: Arc<RwLock<HashMap<String, String>>>,
    /// Permits consumed by gate steps.
    gate: Arc<Semaphore>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher that succeeds without output.
    pub fn new() -> Self {
        Self {
            script: Arc::new(RwLock::new(FetchScript::default())),
            launches: Arc::new(RwLock::new(Vec::new())),
            not_installed: Arc::new(RwLock::new(false)),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            direct_urls: Arc::new(RwLock::new(HashMap::new())),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Set the script played by subsequent launches.
    pub async fn set_script(&self, script: FetchScript) {
        *self.script.write().await = script;
    }

    /// Make subsequent launches fail as if the executable were missing.
    pub async fn set_not_installed(&self, missing: bool) {
        *self.not_installed.write().await = missing;
    }

    /// Set a probe result for a specific URL.
    pub async fn set_probe_result(&self, url: impl Into<String>, info: MediaInfo) {
        self.probe_results.write().await.insert(url.into(), info);
    }

    /// Set the direct link returned for a specific URL.
    pub async fn set_direct_url(&self, url: impl Into<String>, direct: impl Into<String>) {
        self.direct_urls
            .write()
            .await
            .insert(url.into(), direct.into());
    }

    /// Let `count` pending gate steps proceed.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Get all recorded launches.
    pub async fn recorded_launches(&self) -> Vec<RecordedLaunch> {
        self.launches.read().await.clone()
    }

    /// Get the number of launches.
    pub async fn launch_count(&self) -> usize {
        self.launches.read().await.len()
    }
}

async fn play(
    steps: Vec<ScriptStep>,
    output_dir: PathBuf,
    output_tx: &tokio::sync::mpsc::Sender<String>,
    gate: &Semaphore,
) -> Result<(), FetchError> {
    for step in steps {
        match step {
            ScriptStep::Output(text) => {
                let _ = output_tx.send(text).await;
            }
            ScriptStep::File { name, contents } => {
                tokio::fs::write(output_dir.join(name), contents).await?;
            }
            ScriptStep::Pause(duration) => tokio::time::sleep(duration).await,
            ScriptStep::Gate => {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn launch(&self, request: FetchRequest) -> Result<FetchHandle, FetchError> {
        let cookie_contents = match &request.cookie_file {
            Some(path) => tokio::fs::read_to_string(path).await.ok(),
            None => None,
        };
        self.launches.write().await.push(RecordedLaunch {
            request: request.clone(),
            cookie_contents,
        });

        if *self.not_installed.read().await {
            return Err(FetchError::NotInstalled {
                path: PathBuf::from("yt-dlp"),
            });
        }

        let FetchScript { steps, outcome } = self.script.read().await.clone();
        let gate = Arc::clone(&self.gate);
        let (output_tx, outcome_tx, handle) = fetch_channel(16);
        let output_dir = request.output_dir;

        tokio::spawn(async move {
            let played = play(steps, output_dir, &output_tx, &gate).await;
            drop(output_tx);

            let result = played.and_then(|()| match outcome {
                MockOutcome::Success => Ok(()),
                MockOutcome::Exit(code) => Err(FetchError::ExitFailure {
                    code: Some(code),
                    diagnostic: Some("ERROR: scripted failure".to_string()),
                }),
            });
            let _ = outcome_tx.send(result);
        });

        Ok(handle)
    }

    async fn probe(&self, url: &str) -> Result<MediaInfo, FetchError> {
        self.probe_results
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::ExitFailure {
                code: Some(1),
                diagnostic: Some(format!("ERROR: Unsupported URL: {}", url)),
            })
    }

    async fn resolve_direct_url(
        &self,
        url: &str,
        _format: MediaFormat,
    ) -> Result<String, FetchError> {
        self.direct_urls
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::probe_failed("no direct link in output"))
    }

    async fn validate(&self) -> Result<(), FetchError> {
        if *self.not_installed.read().await {
            return Err(FetchError::NotInstalled {
                path: PathBuf::from("yt-dlp"),
            });
        }
        Ok(())
    }
}
