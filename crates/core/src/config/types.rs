use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::fetcher::FetcherConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Config {
    /// Resolves relative storage paths against `base` (normally the install
    /// location of the running binary).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.storage.downloads_dir.is_relative() {
            self.storage.downloads_dir = base.join(&self.storage.downloads_dir);
        }
        if self.storage.work_dir.is_relative() {
            self.storage.work_dir = base.join(&self.storage.work_dir);
        }
        self
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    3000
}

/// Filesystem layout for artifacts and per-job scratch space.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Public artifacts area served under `/files`.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    /// Root for per-job working directories and transient cookie files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            work_dir: default_work_dir(),
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("work")
}

/// Retention window for job records and artifact files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Age after which jobs and artifacts are evicted (seconds).
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
    /// How often the sweeper runs (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_max_age() -> u64 {
    3600 // 1 hour
}

fn default_sweep_interval() -> u64 {
    600 // 10 minutes
}
