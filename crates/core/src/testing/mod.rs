//! Testing utilities and mock implementations.
//!
//! [`MockFetcher`] stands in for yt-dlp so the whole job lifecycle can be
//! exercised without the real tool or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use streamsaver_core::testing::{fixtures, MockFetcher};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.set_script(fixtures::single_video_script("clip.mp4")).await;
//!
//! // Use in a JobOrchestrator...
//! ```

mod mock_fetcher;

pub use mock_fetcher::{FetchScript, MockFetcher, MockOutcome, RecordedLaunch, ScriptStep};

/// Test fixtures and helper functions.
pub mod fixtures {
    use super::FetchScript;
    use crate::fetcher::{BrowserCookie, MediaInfo};

    /// A yt-dlp progress line, newline-terminated.
    pub fn download_line(percent: f32, total: &str, speed: &str, eta: &str) -> String {
        format!(
            "[download] {:>5.1}% of {} at {} ETA {}\n",
            percent, total, speed, eta
        )
    }

    /// A yt-dlp playlist-position line, newline-terminated.
    pub fn playlist_line(index: u32, count: u32) -> String {
        format!("[download] Downloading item {} of {}\n", index, count)
    }

    /// One item downloading in two steps with a gate in between, then
    /// producing `filename`.
    pub fn single_video_script(filename: &str) -> FetchScript {
        FetchScript::new()
            .output("[youtube] abc123: Downloading webpage\n")
            .output(download_line(25.0, "10.00MiB", "1.00MiB/s", "00:08"))
            .gate()
            .output(download_line(100.0, "10.00MiB", "2.00MiB/s", "00:00"))
            .file(filename, b"media bytes".to_vec())
    }

    /// A playlist of `count` items, gated before each item so a test can
    /// observe every position.
    pub fn playlist_script(count: u32, extension: &str) -> FetchScript {
        let mut script = FetchScript::new();
        for index in 1..=count {
            script = script
                .output(playlist_line(index, count))
                .output(download_line(50.0, "3.00MiB", "1.50MiB/s", "00:01"))
                .gate()
                .file(
                    format!("{} - Track {}.{}", index, index, extension),
                    format!("track {}", index).into_bytes(),
                );
        }
        script
    }

    /// Probe result for a single video.
    pub fn media_info(title: &str, url: &str) -> MediaInfo {
        MediaInfo {
            title: title.to_string(),
            thumbnail: Some("https://i.example.com/thumb.jpg".to_string()),
            url: url.to_string(),
            site: "Youtube".to_string(),
            is_playlist: false,
            video_count: 1,
        }
    }

    /// Probe result for a playlist.
    pub fn playlist_info(title: &str, url: &str, count: u32) -> MediaInfo {
        MediaInfo {
            is_playlist: true,
            video_count: count,
            ..media_info(title, url)
        }
    }

    /// A browser cookie for `.example.com`.
    pub fn browser_cookie(name: &str, value: &str) -> BrowserCookie {
        BrowserCookie {
            domain: ".example.com".to_string(),
            host_only: false,
            path: "/".to_string(),
            secure: true,
            expiration_date: Some(1_900_000_000.0),
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}
