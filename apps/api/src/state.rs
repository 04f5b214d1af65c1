use std::sync::Arc;

use crate::batch_jobs::BatchJobs;
use crate::config::Config;
use crate::pipeline::summary::Stage;
use crate::slack::SlackBot;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jobs: Arc<BatchJobs>,
    pub riva: Arc<SlackBot>,
    pub arjun: Arc<SlackBot>,
}

impl AppState {
    pub fn bot(&self, stage: Stage) -> &Arc<SlackBot> {
        match stage {
            Stage::L1 => &self.riva,
            Stage::L2 => &self.arjun,
        }
    }
}
