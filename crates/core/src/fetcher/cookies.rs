//! Transient cookie files handed to the fetcher.
//!
//! The extension forwards the browser's cookies for the page; they are
//! transcribed into the Netscape cookie-jar format yt-dlp reads. The file
//! belongs to a single job and is removed when its [`CookieFile`] is dropped.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";

/// A cookie as reported by the browser extension cookies API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub domain: String,
    #[serde(default)]
    pub host_only: bool,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    /// Expiry as seconds since the epoch; absent for session cookies.
    #[serde(default)]
    pub expiration_date: Option<f64>,
    pub name: String,
    pub value: String,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl BrowserCookie {
    /// Renders the cookie as one tab-separated cookie-jar record:
    /// domain, include-subdomains flag, path, secure flag, expiry, name, value.
    pub fn to_netscape_line(&self) -> String {
        let domain = if !self.host_only && !self.domain.starts_with('.') {
            format!(".{}", self.domain)
        } else {
            self.domain.clone()
        };
        let expiry = self
            .expiration_date
            .filter(|e| e.is_finite() && *e > 0.0)
            .map(|e| e as i64)
            .unwrap_or(0);

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            sanitize(&domain),
            flag(!self.host_only),
            sanitize(&self.path),
            flag(self.secure),
            expiry,
            sanitize(&self.name),
            sanitize(&self.value),
        )
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Field separators inside a value would corrupt the record.
fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], "")
}

/// Renders a complete cookie-jar file.
pub fn render_cookie_file(cookies: &[BrowserCookie]) -> String {
    let mut out = String::from(NETSCAPE_HEADER);
    out.push('\n');
    for cookie in cookies {
        out.push_str(&cookie.to_netscape_line());
        out.push('\n');
    }
    out
}

/// A cookie file on disk, deleted on drop.
#[derive(Debug)]
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    /// Writes `cookies` to `path`, readable only by the current user on unix.
    pub async fn write(path: PathBuf, cookies: &[BrowserCookie]) -> std::io::Result<Self> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        // Construct the guard first so a failed write still removes the file.
        let guard = Self { path };
        let mut file = options.open(&guard.path).await?;
        file.write_all(render_cookie_file(cookies).as_bytes())
            .await?;
        file.flush().await?;

        debug!("Wrote {} cookies to {:?}", cookies.len(), guard.path);
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CookieFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed cookie file {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove cookie file {:?}: {}", self.path, e),
        }
    }
}
