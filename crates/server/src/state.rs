use std::sync::Arc;
use streamsaver_core::{Config, Fetcher, JobOrchestrator, JobRegistry};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<JobOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &JobOrchestrator {
        self.orchestrator.as_ref()
    }

    pub fn registry(&self) -> &JobRegistry {
        self.orchestrator.registry().as_ref()
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.orchestrator.fetcher().as_ref()
    }
}
