//! Trait definitions for the fetcher module.

use async_trait::async_trait;

use super::error::FetchError;
use super::types::{FetchHandle, FetchRequest, MediaFormat, MediaInfo};

/// An external media fetcher.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Starts a download into `request.output_dir`.
    ///
    /// Returns once the process is running. Failing to start the process at
    /// all is reported here; everything after that arrives through the
    /// handle's terminal outcome.
    async fn launch(&self, request: FetchRequest) -> Result<FetchHandle, FetchError>;

    /// Reads title/thumbnail/playlist information without downloading.
    async fn probe(&self, url: &str) -> Result<MediaInfo, FetchError>;

    /// Resolves a direct media link the browser can download itself.
    async fn resolve_direct_url(&self, url: &str, format: MediaFormat)
        -> Result<String, FetchError>;

    /// Validates that the fetcher is installed and runnable.
    async fn validate(&self) -> Result<(), FetchError>;
}
