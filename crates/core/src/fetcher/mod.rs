//! Fetcher module: supervises the external media fetcher.
//!
//! This module provides the `Fetcher` trait and a yt-dlp implementation that
//! launches the tool for one job, streams its stdout incrementally and
//! resolves to exactly one terminal outcome.
//!
//! # Example
//!
//! ```ignore
//! use streamsaver_core::fetcher::{Fetcher, FetchRequest, MediaFormat, Quality, YtDlpFetcher};
//!
//! let fetcher = YtDlpFetcher::with_defaults();
//!
//! let mut handle = fetcher.launch(FetchRequest {
//!     url: "https://www.youtube.com/watch?v=abc".to_string(),
//!     format: MediaFormat::Mp4,
//!     quality: Quality::P720,
//!     output_dir: PathBuf::from("/tmp/job-1"),
//!     cookie_file: None,
//! }).await?;
//!
//! while let Some(chunk) = handle.next_chunk().await {
//!     print!("{}", chunk);
//! }
//! handle.wait().await?;
//! ```

mod args;
mod config;
mod cookies;
mod error;
mod locate;
mod traits;
mod types;
mod ytdlp;

pub use args::{build_download_args, is_playlist_url, is_short_form, video_format_selector};
pub use config::FetcherConfig;
pub use cookies::{render_cookie_file, BrowserCookie, CookieFile};
pub use error::FetchError;
pub use locate::{locate_binary, resolve_binary};
pub use traits::Fetcher;
pub use types::{fetch_channel, FetchHandle, FetchRequest, MediaFormat, MediaInfo, Quality};
pub use ytdlp::YtDlpFetcher;
