//! Line parser and chunk tracker for yt-dlp progress output.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::JobProgress;

/// `[download]  45.3% of ~ 10.50MiB at 2.35MiB/s ETA 00:04`
/// `[download] 100% of 10.50MiB in 00:03`
static DOWNLOAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[download\]\s+(\d+(?:\.\d+)?)%\s+of\s+~?\s*(\S+)(?:\s+at\s+(\S+(?:\s+B/s)?))?(?:\s+ETA\s+(\S+))?",
    )
    .unwrap()
});

/// `[download] Downloading item 2 of 3` (older releases say "video").
static PLAYLIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[download\]\s+Downloading\s+(?:item|video)\s+(\d+)\s+of\s+(\d+)").unwrap()
});

/// A single recognised line of fetcher output.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Per-item download progress.
    Download {
        percent: f32,
        total_size: String,
        speed: Option<String>,
        eta: Option<String>,
    },
    /// The fetcher moved on to item `index` of `count`.
    PlaylistItem { index: u32, count: u32 },
}

/// Parses one line of fetcher output.
///
/// Returns `None` for anything unrecognised, including lines whose numeric
/// groups fail to parse.
pub fn parse_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim();

    if let Some(caps) = PLAYLIST_RE.captures(line) {
        let index = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let count = caps.get(2)?.as_str().parse::<u32>().ok()?;
        return Some(ProgressLine::PlaylistItem { index, count });
    }

    let caps = DOWNLOAD_RE.captures(line)?;
    let percent = caps.get(1)?.as_str().parse::<f32>().ok()?;
    if !percent.is_finite() {
        return None;
    }

    Some(ProgressLine::Download {
        percent,
        total_size: normalize_units(caps.get(2)?.as_str()),
        speed: caps.get(3).map(|m| normalize_units(m.as_str())),
        eta: caps.get(4).map(|m| m.as_str().to_string()),
    })
}

/// Rewrites binary unit labels to their decimal display form (`MiB` -> `MB`).
///
/// Only the label changes; the number is left as reported.
pub fn normalize_units(token: &str) -> String {
    token
        .replace("KiB", "KB")
        .replace("MiB", "MB")
        .replace("GiB", "GB")
        .replace("TiB", "TB")
}

/// Turns a stream of raw output chunks into progress snapshots.
///
/// Chunks may contain several lines or end in the middle of one; the
/// unterminated tail is kept until the next chunk (or [`finish`]).
///
/// [`finish`]: ProgressTracker::finish
#[derive(Debug, Default)]
pub struct ProgressTracker {
    buffer: String,
    current: Option<JobProgress>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a raw chunk and returns the snapshots it produced, in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<JobProgress> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find(|c| c == '\n' || c == '\r') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(progress) = self.apply(&line) {
                events.push(progress);
            }
        }
        events
    }

    /// Flushes a trailing line that was never terminated.
    pub fn finish(&mut self) -> Option<JobProgress> {
        let line = std::mem::take(&mut self.buffer);
        self.apply(&line)
    }

    /// The most recent snapshot, if any line has been recognised yet.
    pub fn current(&self) -> Option<&JobProgress> {
        self.current.as_ref()
    }

    fn apply(&mut self, line: &str) -> Option<JobProgress> {
        let next = match (parse_line(line)?, &self.current) {
            (ProgressLine::PlaylistItem { index, count }, _) => JobProgress::Playlist {
                current_index: index,
                total_count: count,
                speed: None,
                eta: None,
            },
            // While a playlist position is showing, item progress only
            // refreshes speed and ETA.
            (
                ProgressLine::Download { speed, eta, .. },
                Some(JobProgress::Playlist {
                    current_index,
                    total_count,
                    ..
                }),
            ) => JobProgress::Playlist {
                current_index: *current_index,
                total_count: *total_count,
                speed,
                eta,
            },
            (
                ProgressLine::Download {
                    percent,
                    total_size,
                    speed,
                    eta,
                },
                _,
            ) => JobProgress::Downloading {
                percent,
                total_size,
                speed,
                eta,
            },
        };

        self.current = Some(next.clone());
        Some(next)
    }
}
