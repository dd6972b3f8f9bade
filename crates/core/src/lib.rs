pub mod assembler;
pub mod config;
pub mod fetcher;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod sweeper;
pub mod testing;

pub use assembler::{archive_name, Artifact, AssemblyError, AssemblyPlan, ResultAssembler};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, RetentionConfig, ServerConfig, StorageConfig,
};
pub use fetcher::{
    locate_binary, BrowserCookie, CookieFile, FetchError, FetchHandle, FetchRequest, Fetcher,
    FetcherConfig, MediaFormat, MediaInfo, Quality, YtDlpFetcher,
};
pub use job::{Job, JobError, JobEvent, JobRegistry, JobResult, JobStatus, NewJob};
pub use orchestrator::{
    JobOrchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus, StartJobRequest,
};
pub use progress::{parse_line, JobProgress, ProgressLine, ProgressTracker};
pub use sweeper::{RetentionSweeper, SweepReport};
