//! Chat front end shared by the Riva (L1) and Arjun (L2) bots.
//!
//! Reply order: structured command → intent rules (model fallback) →
//! canned reply or work-query routing. Replies are plain text; delivery is
//! the chat transport's job.

use std::sync::Arc;

use tracing::info;

use crate::batch_jobs::BatchJobs;
use crate::errors::AppError;
use crate::pipeline::records::find_candidates;
use crate::pipeline::summary::Stage;
use crate::pipeline::PipelineContext;
use crate::summary_store::SummaryStore;

pub mod commands;
pub mod intent;
pub mod messages;
pub mod parsers;
mod prompts;
pub mod qa;

use intent::{decide_intent, Intent, IntentFallback};
use qa::WorkQuery;

pub struct ChatBot {
    stage: Stage,
    pipeline: Arc<PipelineContext>,
    summaries: Arc<SummaryStore>,
    jobs: Arc<BatchJobs>,
    fallback: Option<Arc<dyn IntentFallback>>,
}

impl ChatBot {
    pub fn new(
        stage: Stage,
        pipeline: Arc<PipelineContext>,
        summaries: Arc<SummaryStore>,
        jobs: Arc<BatchJobs>,
        fallback: Option<Arc<dyn IntentFallback>>,
    ) -> Self {
        Self {
            stage,
            pipeline,
            summaries,
            jobs,
            fallback,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Answers one cleaned user message.
    pub async fn reply(&self, text: &str) -> Result<String, AppError> {
        let text = text.trim();
        if let Some(command) = commands::parse_command(text, self.stage) {
            return self.execute(command).await;
        }

        let decision = decide_intent(text, self.stage, self.fallback.as_deref()).await;
        info!(
            bot = self.stage.agent(),
            intent = ?decision.intent,
            confidence = decision.confidence,
            notes = %decision.notes,
            "Intent decided"
        );

        let reply = match decision.intent {
            Intent::Greeting => messages::greeting(self.stage).to_string(),
            Intent::Help => messages::capabilities(self.stage).to_string(),
            Intent::SmallTalk => messages::small_talk(self.stage).to_string(),
            intent if intent.is_workflow_for(self.stage) => match self.work_query(text).await? {
                Some(answer) => answer,
                None => messages::no_work_match(self.stage).to_string(),
            },
            _ => messages::unsure(self.stage).to_string(),
        };
        Ok(reply)
    }

    async fn work_query(&self, text: &str) -> Result<Option<String>, AppError> {
        let Some(query) = qa::parse_work_query(text, self.stage, &self.pipeline.folders.roles) else {
            return Ok(None);
        };
        info!(bot = self.stage.agent(), query = ?query, "Work query");
        let answer = match query {
            WorkQuery::BatchRun => messages::batch_completion(&self.jobs.run(self.stage).await),
            WorkQuery::BatchStatus => match self.summaries.latest(self.stage).await {
                Some(summary) => messages::last_run_summary(self.stage, Some(&summary)),
                None => qa::NO_COMPLETED_RUNS.to_string(),
            },
            WorkQuery::Candidate { candidate, role } => self
                .candidate_summary(&candidate, role.as_deref())
                .await?
                .unwrap_or_else(|| qa::not_found_text(&candidate, role.as_deref())),
        };
        Ok(Some(answer))
    }

    /// Stage view of a candidate found in any location. `None` when no folder
    /// matches, the role is not configured, or (on Arjun) there is no L2 result.
    pub(crate) async fn candidate_summary(
        &self,
        candidate: &str,
        role: Option<&str>,
    ) -> Result<Option<String>, AppError> {
        let role = match role {
            Some(text) => match parsers::normalize_role(text, &self.pipeline.folders.roles) {
                Some(role) => Some(role),
                None => return Ok(None),
            },
            None => None,
        };
        let records = find_candidates(
            self.pipeline.store.as_ref(),
            &self.pipeline.folders,
            candidate,
            role.as_deref(),
        )
        .await?;

        Ok(match self.stage {
            Stage::L1 => records
                .iter()
                .find(|r| r.l1.is_some() || r.l1_status.is_some())
                .or(records.first())
                .map(messages::l1_answer),
            Stage::L2 => records.iter().find_map(messages::l2_answer),
        })
    }
}
