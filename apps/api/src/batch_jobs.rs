//! Batch runs shared by the HTTP triggers, the chat bots and the scheduler.
//!
//! Runs of the same stage are serialized; an L1 and an L2 run may overlap.
//! Each finished run replaces the cached summary and is announced in the
//! stage's default channel.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::chat::messages::batch_notification;
use crate::pipeline::summary::{BatchSummary, Stage};
use crate::pipeline::PipelineContext;
use crate::slack::client::ChatPoster;
use crate::summary_store::SummaryStore;

/// Where a stage announces finished runs.
pub struct Notifier {
    pub poster: Arc<dyn ChatPoster>,
    pub channel: Option<String>,
}

pub struct BatchJobs {
    pipeline: Arc<PipelineContext>,
    summaries: Arc<SummaryStore>,
    l1: (Mutex<()>, Notifier),
    l2: (Mutex<()>, Notifier),
}

impl BatchJobs {
    pub fn new(
        pipeline: Arc<PipelineContext>,
        summaries: Arc<SummaryStore>,
        riva: Notifier,
        arjun: Notifier,
    ) -> Self {
        Self {
            pipeline,
            summaries,
            l1: (Mutex::new(()), riva),
            l2: (Mutex::new(()), arjun),
        }
    }

    fn slot(&self, stage: Stage) -> &(Mutex<()>, Notifier) {
        match stage {
            Stage::L1 => &self.l1,
            Stage::L2 => &self.l2,
        }
    }

    /// Runs the stage's batch, caches the summary and posts the notification.
    pub async fn run(&self, stage: Stage) -> BatchSummary {
        let (lock, notifier) = self.slot(stage);
        let _running = lock.lock().await;

        let summary = self.pipeline.run_batch(stage).await;
        self.summaries.store(summary.clone()).await;
        info!(
            correlation_id = %summary.run_id,
            stage = stage.as_str(),
            evaluated = summary.evaluated,
            errors = summary.errors,
            "Batch summary cached"
        );
        notify(notifier, &summary).await;
        summary
    }
}

async fn notify(notifier: &Notifier, summary: &BatchSummary) {
    let Some(channel) = notifier.channel.as_deref() else {
        warn!(
            bot = summary.stage.agent(),
            "No default channel configured; skipping batch notification"
        );
        return;
    };
    if let Err(e) = notifier
        .poster
        .post_message(channel, &batch_notification(summary), None)
        .await
    {
        warn!(
            correlation_id = %summary.run_id,
            bot = summary.stage.agent(),
            "Batch notification failed: {e}"
        );
    }
}
