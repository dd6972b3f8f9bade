//! Request, result, and handle types for the fetcher module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

use super::error::FetchError;

/// Output format requested by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Combined video and audio in an MP4 container.
    #[default]
    #[serde(alias = "video")]
    Mp4,
    /// Audio only, transcoded after download.
    #[serde(alias = "audio")]
    Mp3,
}

impl MediaFormat {
    /// Whether only the audio stream is wanted.
    pub fn is_audio(&self) -> bool {
        matches!(self, MediaFormat::Mp3)
    }

    /// File extension of the produced artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mp3 => "mp3",
        }
    }
}

/// Quality ceiling for video downloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// No cap.
    #[default]
    #[serde(rename = "best", alias = "highest")]
    Best,
    /// At most 720 lines.
    #[serde(rename = "720p", alias = "720")]
    P720,
    /// At most 360 lines.
    #[serde(rename = "360p", alias = "360")]
    P360,
}

impl Quality {
    /// Maximum frame height, if capped.
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Quality::Best => None,
            Quality::P720 => Some(720),
            Quality::P360 => Some(360),
        }
    }
}

/// Everything needed to run one download.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL (single item or playlist).
    pub url: String,
    /// Requested output format.
    pub format: MediaFormat,
    /// Requested quality ceiling (ignored for audio).
    pub quality: Quality,
    /// Job-private directory the fetcher writes into.
    pub output_dir: PathBuf,
    /// Netscape-format cookie file, if the client supplied cookies.
    pub cookie_file: Option<PathBuf>,
}

/// Metadata returned by a probe, used by the extension's preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub title: String,
    pub thumbnail: Option<String>,
    pub url: String,
    pub site: String,
    pub is_playlist: bool,
    pub video_count: u32,
}

/// Handle to a running fetch.
///
/// Yields raw stdout chunks in emission order, then exactly one terminal
/// outcome. The output channel is closed before the outcome is sent, so
/// draining [`next_chunk`] to `None` and then calling [`wait`] observes every
/// chunk before the result.
///
/// [`next_chunk`]: FetchHandle::next_chunk
/// [`wait`]: FetchHandle::wait
#[derive(Debug)]
pub struct FetchHandle {
    output_rx: mpsc::Receiver<String>,
    outcome_rx: oneshot::Receiver<Result<(), FetchError>>,
}

impl FetchHandle {
    pub fn new(
        output_rx: mpsc::Receiver<String>,
        outcome_rx: oneshot::Receiver<Result<(), FetchError>>,
    ) -> Self {
        Self {
            output_rx,
            outcome_rx,
        }
    }

    /// Next raw stdout chunk, or `None` once the process closed its output.
    pub async fn next_chunk(&mut self) -> Option<String> {
        self.output_rx.recv().await
    }

    /// Waits for the terminal outcome.
    pub async fn wait(self) -> Result<(), FetchError> {
        drop(self.output_rx);
        self.outcome_rx.await.unwrap_or_else(|_| {
            Err(FetchError::Io(std::io::Error::other(
                "fetch task ended without reporting an outcome",
            )))
        })
    }
}

/// Creates a connected handle and the sender halves used by a fetcher
/// implementation.
pub fn fetch_channel(
    buffer: usize,
) -> (
    mpsc::Sender<String>,
    oneshot::Sender<Result<(), FetchError>>,
    FetchHandle,
) {
    let (output_tx, output_rx) = mpsc::channel(buffer);
    let (outcome_tx, outcome_rx) = oneshot::channel();
    (output_tx, outcome_tx, FetchHandle::new(output_rx, outcome_rx))
}
