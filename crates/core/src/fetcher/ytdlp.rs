//! yt-dlp based fetcher implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use super::args::build_download_args;
use super::config::FetcherConfig;
use super::error::FetchError;
use super::locate::locate_binary;
use super::traits::Fetcher;
use super::types::{fetch_channel, FetchHandle, FetchRequest, MediaFormat, MediaInfo};

/// Buffered stdout chunks between the process and the consumer.
const OUTPUT_BUFFER: usize = 64;

/// Read size for stdout chunks.
const READ_CHUNK_SIZE: usize = 8192;

/// Stderr lines carrying this prefix are real failures; everything else
/// yt-dlp prints there is informational.
const ERROR_MARKER: &str = "ERROR:";

/// yt-dlp based fetcher implementation.
pub struct YtDlpFetcher {
    config: FetcherConfig,
    binary: PathBuf,
}

impl YtDlpFetcher {
    /// Creates a new fetcher, resolving the binary location once.
    pub fn new(config: FetcherConfig) -> Self {
        let binary = locate_binary(config.path.as_deref());
        Self { config, binary }
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FetcherConfig::default())
    }

    /// The resolved binary path.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn spawn_error(&self, e: std::io::Error) -> FetchError {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                FetchError::NotInstalled {
                    path: self.binary.clone(),
                }
            }
            _ => FetchError::Io(e),
        }
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.config.probe_timeout_secs)
    }

    /// Runs a short-lived yt-dlp invocation and returns its stdout.
    async fn run_to_completion(&self, args: &[&str]) -> Result<String, FetchError> {
        let output = timeout(
            self.probe_timeout(),
            Command::new(&self.binary)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            timeout_secs: self.config.probe_timeout_secs,
        })?
        .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::ExitFailure {
                code: output.status.code(),
                diagnostic: error_lines(stderr.lines()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parses `--dump-single-json` output into MediaInfo.
    fn parse_probe_output(url: &str, output: &str) -> Result<MediaInfo, FetchError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(rename = "_type")]
            kind: Option<String>,
            title: Option<String>,
            thumbnail: Option<String>,
            #[serde(default)]
            thumbnails: Vec<ProbeThumbnail>,
            webpage_url: Option<String>,
            extractor_key: Option<String>,
            extractor: Option<String>,
            playlist_count: Option<u32>,
            entries: Option<Vec<serde_json::Value>>,
        }

        #[derive(Deserialize)]
        struct ProbeThumbnail {
            url: String,
        }

        let probe: ProbeOutput = serde_json::from_str(output.trim())
            .map_err(|e| FetchError::probe_failed(format!("invalid yt-dlp JSON: {}", e)))?;

        let is_playlist = probe.kind.as_deref() == Some("playlist");
        let video_count = if is_playlist {
            probe
                .playlist_count
                .or_else(|| probe.entries.as_ref().map(|e| e.len() as u32))
                .unwrap_or(0)
        } else {
            1
        };

        // Thumbnails are listed worst to best.
        let thumbnail = probe
            .thumbnail
            .or_else(|| probe.thumbnails.last().map(|t| t.url.clone()));

        Ok(MediaInfo {
            title: probe.title.unwrap_or_else(|| "Untitled".to_string()),
            thumbnail,
            url: probe.webpage_url.unwrap_or_else(|| url.to_string()),
            site: probe
                .extractor_key
                .or(probe.extractor)
                .unwrap_or_else(|| "unknown".to_string()),
            is_playlist,
            video_count,
        })
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn launch(&self, request: FetchRequest) -> Result<FetchHandle, FetchError> {
        let args = build_download_args(&request, &self.config);
        debug!("Launching {:?} {:?}", self.binary, args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .current_dir(&request.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Io(std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::Io(std::io::Error::other("stderr not captured")))?;

        info!(
            "Started yt-dlp (pid {:?}) for {}",
            child.id(),
            request.url
        );

        let (output_tx, outcome_tx, handle) = fetch_channel(OUTPUT_BUFFER);

        tokio::spawn(async move {
            let stderr_task = tokio::spawn(drain_stderr(stderr));

            // The output sender is dropped when the pump returns, which closes
            // the chunk stream before the outcome is sent.
            pump_stdout(stdout, output_tx).await;

            let diagnostic = stderr_task.await.unwrap_or_default();
            let outcome = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(FetchError::ExitFailure {
                    code: status.code(),
                    diagnostic,
                }),
                Err(e) => Err(FetchError::Io(e)),
            };

            let _ = outcome_tx.send(outcome);
        });

        Ok(handle)
    }

    async fn probe(&self, url: &str) -> Result<MediaInfo, FetchError> {
        let stdout = self
            .run_to_completion(&[
                "--dump-single-json",
                "--flat-playlist",
                "--no-warnings",
                "--",
                url,
            ])
            .await?;
        Self::parse_probe_output(url, &stdout)
    }

    async fn resolve_direct_url(
        &self,
        url: &str,
        format: MediaFormat,
    ) -> Result<String, FetchError> {
        let selector = if format.is_audio() {
            "bestaudio"
        } else {
            "best[ext=mp4]/best"
        };
        let stdout = self
            .run_to_completion(&["-f", selector, "-g", "--no-playlist", "--", url])
            .await?;

        stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FetchError::probe_failed("no direct link found"))
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let version = self.run_to_completion(&["--version"]).await?;
        info!("Using yt-dlp {} at {:?}", version.trim(), self.binary);
        Ok(())
    }
}

/// Forwards stdout to the consumer as it arrives.
///
/// Multi-byte characters split across reads are held back until complete.
/// If the consumer has gone away the output is still drained so the process
/// never blocks on a full pipe.
async fn pump_stdout<R: AsyncRead + Unpin>(mut stdout: R, output_tx: mpsc::Sender<String>) {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut pending: Vec<u8> = Vec::new();
    let mut consumer_gone = false;

    loop {
        let n = match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read yt-dlp stdout: {}", e);
                break;
            }
        };
        pending.extend_from_slice(&buf[..n]);

        let chunk = take_utf8_prefix(&mut pending);
        if chunk.is_empty() || consumer_gone {
            continue;
        }
        if output_tx.send(chunk).await.is_err() {
            consumer_gone = true;
        }
    }

    if !pending.is_empty() && !consumer_gone {
        let _ = output_tx
            .send(String::from_utf8_lossy(&pending).into_owned())
            .await;
    }
}

/// Splits off the longest decodable prefix, leaving an incomplete trailing
/// sequence in `pending`. Invalid bytes are replaced.
fn take_utf8_prefix(pending: &mut Vec<u8>) -> String {
    let split = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let rest = pending.split_off(split);
    let chunk = String::from_utf8_lossy(&pending[..]).into_owned();
    *pending = rest;
    chunk
}

/// Logs stderr and returns the error-marked lines, if any.
async fn drain_stderr<R: AsyncRead + Unpin>(stderr: R) -> Option<String> {
    let mut lines = BufReader::new(stderr).lines();
    let mut errors = Vec::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.starts_with(ERROR_MARKER) {
                    error!("yt-dlp: {}", line);
                    errors.push(line);
                } else if line.starts_with("WARNING:") {
                    warn!("yt-dlp: {}", line);
                } else {
                    debug!("yt-dlp: {}", line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read yt-dlp stderr: {}", e);
                break;
            }
        }
    }

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

/// Collects error-marked lines from captured stderr.
fn error_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Option<String> {
    let errors: Vec<&str> = lines.filter(|l| l.starts_with(ERROR_MARKER)).collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}
