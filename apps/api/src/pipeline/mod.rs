//! Batch review pipelines.
//!
//! Flow per candidate: normalize folder → gate on documents → score →
//! map outcome → write result → log decision → move folder → upsert dashboard → remember.
//!
//! Candidates are processed sequentially. A failing candidate is recorded in the
//! summary and the batch moves on.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::FolderLayout;
use crate::decision::l1::L1Policy;
use crate::decision::l2::L2Policy;
use crate::decision_log::DecisionLog;
use crate::errors::AppError;
use crate::memory::TalentMemory;
use crate::scoring::CandidateScorer;
use crate::sheets::dashboard::Dashboard;
use crate::storage::{FileStore, Folder};

mod common;
pub mod l1;
pub mod l2;
pub mod records;
pub mod summary;
#[cfg(test)]
pub(crate) mod testing;

use records::name_key;
use summary::{BatchSummary, CandidateError, CandidateReport, OutcomeKind, Stage};

/// Everything a review needs. Sheet writers are `None` when no spreadsheet is configured.
pub struct PipelineContext {
    pub store: Arc<dyn FileStore>,
    pub scorer: Arc<dyn CandidateScorer>,
    pub dashboard: Option<Dashboard>,
    pub decision_log: Option<DecisionLog>,
    pub memory: TalentMemory,
    pub folders: FolderLayout,
    pub l1_policy: L1Policy,
    pub l2_policy: L2Policy,
}

/// Run-level counters a single review may consult.
#[derive(Debug, Clone, Copy)]
pub struct RunState {
    pub run_id: Uuid,
    /// Candidates scored so far in this run.
    pub evaluated: usize,
    /// Candidates advanced so far in this run.
    pub advanced: usize,
}

impl RunState {
    fn from_summary(summary: &BatchSummary) -> Self {
        Self {
            run_id: summary.run_id,
            evaluated: summary.evaluated,
            advanced: summary.advanced,
        }
    }
}

impl PipelineContext {
    /// Reviews every candidate folder under the stage's pending folder, role by role.
    pub async fn run_batch(&self, stage: Stage) -> BatchSummary {
        let mut summary = BatchSummary::new(stage, Uuid::new_v4());
        info!(
            correlation_id = %summary.run_id,
            stage = stage.as_str(),
            "Starting {} batch",
            stage.agent()
        );

        for role in &self.folders.roles {
            let source = self.folders.role_folder(stage.source(), role);
            let folders = match self.store.list_folders(&source).await {
                Ok(folders) => folders,
                Err(e) => {
                    error!(correlation_id = %summary.run_id, role = %role, "Failed to list '{source}': {e}");
                    let e = AppError::from(e);
                    summary.record_error(CandidateError {
                        candidate_name: String::new(),
                        role: role.clone(),
                        folder_id: source.clone(),
                        folder_link: self.store.folder_link(&source),
                        error_code: e.code().to_string(),
                        error_message: e.to_string(),
                    });
                    continue;
                }
            };
            if folders.is_empty() {
                warn!(correlation_id = %summary.run_id, role = %role, "No candidate folders in '{source}'");
                summary.warn(format!("No candidate folders in '{source}'"));
                continue;
            }

            for folder in &folders {
                summary.total_seen += 1;
                let run = RunState::from_summary(&summary);
                match self.review(stage, &run, role, folder).await {
                    Ok(report) => summary.record(report),
                    Err(e) => {
                        error!(
                            correlation_id = %summary.run_id,
                            candidate_name = %folder.name,
                            role = %role,
                            folder_id = %folder.id,
                            "Candidate review failed: {e}"
                        );
                        summary.record_error(CandidateError {
                            candidate_name: folder.name.clone(),
                            role: role.clone(),
                            folder_id: folder.id.clone(),
                            folder_link: self.store.folder_link(&folder.id),
                            error_code: e.code().to_string(),
                            error_message: e.to_string(),
                        });
                    }
                }
            }
        }

        if summary.total_seen == 0 {
            summary.warn(format!(
                "No candidates found in any {} source folder",
                stage.as_str()
            ));
        }
        summary.finish();
        info!(
            correlation_id = %summary.run_id,
            stage = stage.as_str(),
            total_seen = summary.total_seen,
            evaluated = summary.evaluated,
            advanced = summary.advanced,
            rejected = summary.rejected,
            held = summary.held,
            errors = summary.errors,
            "{} batch finished",
            stage.agent()
        );
        summary
    }

    async fn review(
        &self,
        stage: Stage,
        run: &RunState,
        role: &str,
        folder: &Folder,
    ) -> Result<CandidateReport, AppError> {
        match stage {
            Stage::L1 => l1::review_l1(self, run, role, folder).await,
            Stage::L2 => l2::review_l2(self, run, role, folder).await,
        }
    }

    /// Re-runs one candidate found by name in the stage's pending folder.
    /// The capacity cap does not apply to single reviews.
    pub async fn review_candidate(
        &self,
        stage: Stage,
        candidate: &str,
        role: &str,
    ) -> Result<CandidateReport, AppError> {
        let role = self
            .folders
            .resolve_role(role)
            .ok_or_else(|| AppError::Validation(format!("Unknown role '{role}'")))?;
        let source = self.folders.role_folder(stage.source(), role);
        let wanted = name_key(candidate);
        let folder = self
            .store
            .list_folders(&source)
            .await?
            .into_iter()
            .find(|f| name_key(&f.name) == wanted)
            .ok_or_else(|| {
                AppError::NotFound(format!("No folder for '{candidate}' in '{source}'"))
            })?;

        let run = RunState {
            run_id: Uuid::new_v4(),
            evaluated: 0,
            advanced: 0,
        };
        self.review(stage, &run, role, &folder).await
    }
}

/// One-line outcome for chat replies.
pub fn describe_report(report: &CandidateReport) -> String {
    let outcome = match report.outcome {
        OutcomeKind::Advanced => "advanced",
        OutcomeKind::Rejected => "rejected",
        OutcomeKind::Held => "held",
    };
    let mut line = format!(
        "{} ({}) {} with status {}",
        report.candidate_name, report.role, outcome, report.status
    );
    if let Some(score) = report.score {
        line.push_str(&format!(", score {:.0}/100", score * 100.0));
    }
    if let Some(reason) = report.hold_reason() {
        line.push_str(&format!(", reason: {}", reason.describe()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::summary::HoldType;
    use crate::pipeline::testing::{fixture, put_l1_candidate, put_l2_candidate, ScriptedScorer};

    #[tokio::test]
    async fn test_empty_source_folder_warns_with_zero_counts() {
        let fx = fixture(ScriptedScorer::default());
        let summary = fx.ctx.run_batch(Stage::L1).await;

        assert_eq!(summary.total_seen, 0);
        assert_eq!(summary.evaluated, 0);
        assert_eq!(summary.advanced + summary.rejected + summary.held, 0);
        assert_eq!(summary.errors, 0);
        assert!(summary
            .warnings
            .iter()
            .any(|w| w == "No candidate folders in 'L1 Pending Review/IT Support'"));
        assert!(summary.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_batch() {
        let fx = fixture(
            ScriptedScorer::default()
                .l1("Arun Rao", 82.0, &[])
                .failing("Kiran Das")
                .l1("Priya Shah", 30.0, &[]),
        );
        for name in ["Arun Rao", "Kiran Das", "Priya Shah"] {
            put_l1_candidate(&fx.store, name);
        }

        let summary = fx.ctx.run_batch(Stage::L1).await;
        assert_eq!(summary.total_seen, 3);
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.advanced, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.error_details[0].candidate_name, "Kiran Das");
        assert_eq!(summary.error_details[0].error_code, "LLM_ERROR");
        // The failed folder stays where it was
        assert!(!fx.store.keys_under("L1 Pending Review/IT Support/Kiran Das").is_empty());
    }

    #[tokio::test]
    async fn test_failed_move_counts_as_candidate_error() {
        let fx = fixture(
            ScriptedScorer::default()
                .l1("Meera Iyer", 55.0, &[])
                .l1("Priya Shah", 82.0, &[]),
        );
        for name in ["Meera Iyer", "Priya Shah"] {
            put_l1_candidate(&fx.store, name);
        }
        fx.store.fail_moves();

        let summary = fx.ctx.run_batch(Stage::L1).await;
        assert_eq!(summary.held, 1);
        assert_eq!(summary.advanced, 0);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.error_details[0].candidate_name, "Priya Shah");
        assert_eq!(summary.error_details[0].error_code, "STORAGE_ERROR");
        // Only the held candidate reached the decision log (header + one row)
        assert_eq!(fx.sheets.rows("dash", "Decisions").len(), 2);
    }

    #[tokio::test]
    async fn test_rerun_updates_dashboard_row() {
        let fx = fixture(ScriptedScorer::default().l1("Meera Iyer", 55.0, &[]));
        put_l1_candidate(&fx.store, "Meera Iyer");

        let first = fx.ctx.run_batch(Stage::L1).await;
        let second = fx.ctx.run_batch(Stage::L1).await;
        assert_eq!(first.held, 1);
        assert_eq!(second.held, 1);

        let rows = fx.sheets.rows("dash", "IT Support");
        assert_eq!(rows.len(), 2);
        // The decision log is append-only
        assert_eq!(fx.sheets.rows("dash", "Decisions").len(), 3);
    }

    #[tokio::test]
    async fn test_zero_documents_hold_regardless_of_score() {
        let fx = fixture(ScriptedScorer::default().l1("Ghost", 99.0, &[]));
        fx.store.put("L1 Pending Review/IT Support/Ghost/photo.png", "p");

        let summary = fx.ctx.run_batch(Stage::L1).await;
        assert_eq!(summary.held, 1);
        assert_eq!(summary.hold_data_incomplete, 1);
        assert_eq!(summary.candidates[0].hold_type, Some(HoldType::DataIncomplete));
    }

    #[tokio::test]
    async fn test_l1_then_l2_carries_candidate_through() {
        let fx = fixture(
            ScriptedScorer::default()
                .l1("Priya Shah", 80.0, &[])
                .l2("Priya Shah", 88.0, "HIRE"),
        );
        put_l1_candidate(&fx.store, "Priya Shah");
        fx.store.put(
            "L1 Pending Review/IT Support/Priya Shah/l2_interview_transcript.txt",
            "Q: Walk me through a major outage",
        );

        let l1 = fx.ctx.run_batch(Stage::L1).await;
        assert_eq!(l1.advanced, 1);
        let l2 = fx.ctx.run_batch(Stage::L2).await;
        assert_eq!(l2.advanced, 1);
        assert_eq!(l2.candidates[0].l1_vs_l2.as_deref(), Some("IMPROVED"));

        // Same candidate id, so the dashboard row is updated in place
        let rows = fx.sheets.rows("dash", "IT Support");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "L2 Completed");
    }

    #[tokio::test]
    async fn test_review_candidate_by_name() {
        let fx = fixture(ScriptedScorer::default().l2("Arun Rao", 90.0, "HIRE"));
        put_l2_candidate(&fx.store, "Arun Rao", Some(75.0));

        let report = fx
            .ctx
            .review_candidate(Stage::L2, "arun_rao", "it support")
            .await
            .unwrap();
        assert_eq!(report.outcome, OutcomeKind::Advanced);
        assert!(describe_report(&report).starts_with("Arun Rao (IT Support) advanced with status HIRE"));

        let err = fx
            .ctx
            .review_candidate(Stage::L2, "Nobody", "IT Support")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
