//! Job orchestrator.
//!
//! Creates jobs, launches the fetcher for each one on its own task, feeds the
//! fetcher's output through the progress tracker into the registry, and
//! records exactly one terminal transition once the result is assembled:
//! - **Start**: synchronous validation, then returns the new job immediately
//! - **Supervision**: one task per job, the only consumer of its fetch handle
//! - **Cleanup**: cookie file removed before the terminal transition, working
//!   directory removed on every terminal path

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::JobOrchestrator;
pub use types::{validate_url, OrchestratorError, OrchestratorStatus, StartJobRequest};
