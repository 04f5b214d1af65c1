//! Process-lifetime cache of the latest batch summary per stage.
//! A new run replaces the previous summary for its stage.

use tokio::sync::RwLock;

use crate::pipeline::summary::{BatchSummary, Stage};

#[derive(Default)]
pub struct SummaryStore {
    l1: RwLock<Option<BatchSummary>>,
    l2: RwLock<Option<BatchSummary>>,
}

impl SummaryStore {
    fn slot(&self, stage: Stage) -> &RwLock<Option<BatchSummary>> {
        match stage {
            Stage::L1 => &self.l1,
            Stage::L2 => &self.l2,
        }
    }

    pub async fn store(&self, summary: BatchSummary) {
        let stage = summary.stage;
        *self.slot(stage).write().await = Some(summary);
    }

    pub async fn latest(&self, stage: Stage) -> Option<BatchSummary> {
        self.slot(stage).read().await.clone()
    }
}
