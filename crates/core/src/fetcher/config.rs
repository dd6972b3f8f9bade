//! Configuration for the fetcher module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp based fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Explicit path to the yt-dlp binary. When unset the binary is searched
    /// for next to the install location, then in the user's local bin, then
    /// on `PATH`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Audio format requested for audio-only downloads.
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Height cap applied to short-form content regardless of requested quality.
    #[serde(default = "default_short_form_max_height")]
    pub short_form_max_height: u32,

    /// Timeout for metadata probes and direct-link resolution in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Additional arguments passed verbatim to every download.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_short_form_max_height() -> u32 {
    1080
}

fn default_probe_timeout() -> u64 {
    60
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            path: None,
            audio_format: default_audio_format(),
            short_form_max_height: default_short_form_max_height(),
            probe_timeout_secs: default_probe_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl FetcherConfig {
    /// Creates a new config with an explicit binary path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..Default::default()
        }
    }

    /// Sets the probe timeout in seconds.
    pub fn with_probe_timeout(mut self, timeout_secs: u64) -> Self {
        self.probe_timeout_secs = timeout_secs;
        self
    }
}
