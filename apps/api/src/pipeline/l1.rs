//! L1 screening ("Riva"): resume, JD and first-round transcript in,
//! move to L2 / reject / hold out.

use chrono::Utc;
use tracing::info;

use crate::config::FolderKind;
use crate::decision::l1::{decide_l1, L1Decision, L1Outcome};
use crate::decision::{confidence, confidence_band};
use crate::decision_log::{content_hash, DecisionDetail, DecisionEntry};
use crate::errors::AppError;
use crate::memory::EvaluationMemory;
use crate::normalizer::{ArtifactEntry, NormalizationReport, L1_RESULT_FILE};
use crate::pipeline::common::{self, GatingHold, Subject};
use crate::pipeline::records::L1ResultRecord;
use crate::pipeline::summary::{CandidateReport, HoldType, OutcomeKind, Stage};
use crate::pipeline::{PipelineContext, RunState};
use crate::scoring::models::RivaL1Result;
use crate::scoring::L1Input;
use crate::sheets::dashboard::DashboardRow;
use crate::storage::Folder;

/// Share of evaluated candidates that may move to L2 in one run.
pub const CAPACITY_CAP: f64 = 0.45;
/// The cap applies once this many candidates have been evaluated.
pub const CAPACITY_MIN_EVALUATED: usize = 5;

pub const STATUS_MISSING_TRANSCRIPT: &str = "ON_HOLD_MISSING_L1_TRANSCRIPT";
pub const STATUS_DATA_INCOMPLETE: &str = "DATA_INCOMPLETE";
const HOLD_DETAIL: &str = "Awaiting recruiter review";

/// Final L1 routing after the capacity cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Routing {
    Move,
    Reject,
    Hold(HoldType),
}

impl Routing {
    fn from_outcome(outcome: L1Outcome) -> Self {
        match outcome {
            L1Outcome::Move => Routing::Move,
            L1Outcome::Reject => Routing::Reject,
            L1Outcome::HoldManualReview => Routing::Hold(HoldType::Ambiguous),
            L1Outcome::HoldDataIncomplete => Routing::Hold(HoldType::DataIncomplete),
        }
    }

    fn status(&self) -> &'static str {
        match self {
            Routing::Move => "SEND_TO_L2",
            Routing::Reject => "REJECT_AT_L1",
            Routing::Hold(_) => "HOLD",
        }
    }

    fn pipeline_label(&self) -> &'static str {
        match self {
            Routing::Move => "MOVE",
            Routing::Reject => "REJECT",
            Routing::Hold(_) => "HOLD",
        }
    }

    fn outcome_kind(&self) -> OutcomeKind {
        match self {
            Routing::Move => OutcomeKind::Advanced,
            Routing::Reject => OutcomeKind::Rejected,
            Routing::Hold(_) => OutcomeKind::Held,
        }
    }

    fn hold_type(&self) -> Option<HoldType> {
        match self {
            Routing::Hold(h) => Some(*h),
            _ => None,
        }
    }
}

/// True when moving one more candidate would push the run over the L2 capacity cap.
pub fn exceeds_capacity(run: &RunState) -> bool {
    let evaluated = run.evaluated + 1;
    evaluated >= CAPACITY_MIN_EVALUATED
        && (run.advanced + 1) as f64 / evaluated as f64 > CAPACITY_CAP
}

fn apply_capacity(decision: &L1Decision, run: &RunState) -> Routing {
    let routing = Routing::from_outcome(decision.outcome);
    if routing == Routing::Move && exceeds_capacity(run) {
        info!(
            correlation_id = %run.run_id,
            evaluated = run.evaluated + 1,
            advanced = run.advanced,
            "L2 capacity reached, holding candidate as backup"
        );
        return Routing::Hold(HoldType::CapacityBackup);
    }
    routing
}

/// Reviews one candidate folder sitting in the L1 pending folder.
pub async fn review_l1(
    ctx: &PipelineContext,
    run: &RunState,
    role: &str,
    folder: &Folder,
) -> Result<CandidateReport, AppError> {
    info!(
        correlation_id = %run.run_id,
        candidate_name = %folder.name,
        role = %role,
        folder_id = %folder.id,
        "Starting L1 review"
    );

    // Step 1: Normalize and gate on required documents
    let report = common::prepare_folder(ctx, folder, role).await?;
    let subject = Subject {
        role,
        folder,
        report: report.as_ref(),
    };
    let Some(report) = report.as_ref() else {
        return common::hold_unscored(
            ctx,
            run,
            Stage::L1,
            subject,
            None,
            GatingHold {
                hold_type: HoldType::DataIncomplete,
                status: STATUS_DATA_INCOMPLETE,
                detail: "normalization_report_missing",
            },
        )
        .await;
    };
    let (resume, jd, transcript) = match gate(report) {
        Ok(documents) => documents,
        Err(hold) => return common::hold_unscored(ctx, run, Stage::L1, subject, None, hold).await,
    };
    let slots = &report.artifacts;

    // Step 2: Extract document text
    let store = ctx.store.as_ref();
    let resume_text = common::document_text(store, resume).await?;
    let jd_text = common::document_text(store, jd).await?;
    let transcript_text = common::document_text(store, transcript).await?;
    if resume_text.is_empty() || jd_text.is_empty() || transcript_text.is_empty() {
        return common::hold_unscored(
            ctx,
            run,
            Stage::L1,
            subject,
            None,
            GatingHold {
                hold_type: HoldType::DataIncomplete,
                status: STATUS_DATA_INCOMPLETE,
                detail: "document_text_empty",
            },
        )
        .await;
    }
    let feedback = common::optional_text(store, slots.l1_feedback.as_ref()).await;

    // Step 3: Score
    let memory_context = ctx.memory.context_for(report.candidate_id, role).await;
    let result = ctx
        .scorer
        .score_l1(&L1Input {
            candidate_name: folder.name.clone(),
            role: role.to_string(),
            jd: jd_text.clone(),
            resume: resume_text.clone(),
            transcript: transcript_text.clone(),
            feedback,
            memory_context,
            policy: ctx.l1_policy,
        })
        .await?;

    // Step 4: Map to an outcome
    let raw_score = result.fit_score.unwrap_or(f64::NAN);
    let decision = decide_l1(&ctx.l1_policy, raw_score, &result.gating_notes());
    let routing = apply_capacity(&decision, run);
    let confidence = confidence(decision.score);
    info!(
        correlation_id = %run.run_id,
        candidate_name = %folder.name,
        score = decision.score,
        outcome = routing.status(),
        "L1 decision: {}",
        decision.reason
    );

    // Step 5: Route the folder; the result and log row follow only a completed move
    let destination = match routing {
        Routing::Move => Some(FolderKind::L2Pending),
        Routing::Reject => Some(FolderKind::L1Rejected),
        Routing::Hold(_) => None,
    };
    let current = common::relocate(ctx, run, Stage::L1, folder, destination, role).await?;

    // Step 6: Persist the result where the folder landed, then the decision log row
    let record = L1ResultRecord {
        candidate_id: Some(report.candidate_id),
        overall_score: (decision.score * 100.0).round(),
        confidence,
        match_summary: result.match_summary.clone(),
        strengths: result.strengths.clone(),
        risks: risks(&result),
        recommendation: routing.status().to_string(),
        pipeline_recommendation: routing.pipeline_label().to_string(),
        hold_type: routing.hold_type(),
        rationale: decision.reason.clone(),
        evaluated_at: Some(Utc::now()),
    };
    let value = serde_json::to_value(&record).map_err(|e| AppError::Internal(e.into()))?;
    let result_file = store.write_json(&current.id, L1_RESULT_FILE, &value).await?;
    let feedback_link = store.file_link(&result_file.id);

    let mut warnings = Vec::new();
    common::log_decision(
        ctx,
        &DecisionEntry {
            candidate_id: report.candidate_id.to_string(),
            candidate_name: folder.name.clone(),
            role: role.to_string(),
            reviewed_at: Utc::now(),
            detail: DecisionDetail::L1 {
                score: decision.score,
                decision: routing.status().to_string(),
                strengths: result.strengths.clone(),
                concerns: result.concerns.clone(),
                jd_hash: content_hash(&jd_text),
                resume_hash: content_hash(&resume_text),
            },
        },
        &mut warnings,
    )
    .await;

    let status_detail = match routing {
        Routing::Hold(_) => HOLD_DETAIL.to_string(),
        _ => decision.reason.clone(),
    };
    common::write_status(ctx, run, Stage::L1, &current.id, routing.status(), &status_detail)
        .await?;

    // Step 7: Dashboard and memory
    let folder_link = store.folder_link(&current.id);
    let row = dashboard_row(
        &folder.name,
        report,
        &result,
        &record,
        routing,
        feedback_link,
        folder_link.clone(),
    );
    common::upsert_dashboard(ctx, role, &row, &mut warnings).await;

    ctx.memory
        .remember(&EvaluationMemory {
            candidate_id: report.candidate_id,
            candidate_name: folder.name.clone(),
            role: role.to_string(),
            run_id: run.run_id,
            stage: Stage::L1.as_str().to_string(),
            agent: Stage::L1.agent().to_string(),
            inputs_snapshot: common::inputs_snapshot(&resume_text, &jd_text, &transcript_text),
            score: decision.score,
            decision: routing.status().to_string(),
            confidence,
            strengths: result.strengths.clone(),
            concerns: result.concerns.clone(),
            advanced: routing == Routing::Move,
            rejected: routing == Routing::Reject,
            artifacts: serde_json::to_value(&report.artifacts_summary).unwrap_or_default(),
        })
        .await;

    Ok(CandidateReport {
        candidate_name: folder.name.clone(),
        role: role.to_string(),
        folder_id: current.id,
        folder_link,
        outcome: routing.outcome_kind(),
        status: routing.status().to_string(),
        detail: decision.reason,
        hold_type: routing.hold_type(),
        score: Some(decision.score),
        l1_vs_l2: None,
        warnings,
    })
}

/// Document gating in fixed order: nothing recognizable, transcript, resume and JD.
/// Returns the resume, JD and transcript entries when all are present.
fn gate(
    report: &NormalizationReport,
) -> Result<(&ArtifactEntry, &ArtifactEntry, &ArtifactEntry), GatingHold> {
    let slots = &report.artifacts;
    if slots.is_empty() {
        return Err(GatingHold {
            hold_type: HoldType::DataIncomplete,
            status: STATUS_DATA_INCOMPLETE,
            detail: "no_candidate_documents",
        });
    }
    let Some(transcript) = &slots.l1_transcript else {
        return Err(GatingHold {
            hold_type: HoldType::MissingL1Transcript,
            status: STATUS_MISSING_TRANSCRIPT,
            detail: "L1 transcript missing",
        });
    };
    match (&slots.resume, &slots.jd) {
        (Some(resume), Some(jd)) => Ok((resume, jd, transcript)),
        _ => Err(GatingHold {
            hold_type: HoldType::DataIncomplete,
            status: STATUS_DATA_INCOMPLETE,
            detail: "missing_resume_or_jd",
        }),
    }
}

fn risks(result: &RivaL1Result) -> Vec<String> {
    let mut risks = result.concerns.clone();
    risks.extend(result.red_flags.iter().cloned());
    risks.extend(result.risk_flags.iter().cloned());
    risks
}

fn dashboard_row(
    name: &str,
    report: &NormalizationReport,
    result: &RivaL1Result,
    record: &L1ResultRecord,
    routing: Routing,
    feedback_link: String,
    folder_link: String,
) -> DashboardRow {
    let (ai_status, next_action) = match routing {
        Routing::Move => ("Move to L2", "Move to L2".to_string()),
        Routing::Reject => ("Reject", "Reject & Send Email".to_string()),
        Routing::Hold(hold) => ("Hold", hold.sheet_description().to_string()),
    };
    let detail = if result.match_summary.trim().is_empty() {
        record.rationale.clone()
    } else {
        result.match_summary.clone()
    };
    DashboardRow {
        candidate_name: name.to_string(),
        current_stage: "L1 Completed".to_string(),
        ai_status: ai_status.to_string(),
        recommendation_detail: detail,
        confidence: confidence_band(record.confidence).to_string(),
        strengths: result.strengths.clone(),
        concerns: record.risks.clone(),
        l1_outcome: record.outcome_label().to_string(),
        l2_outcome: String::new(),
        next_action,
        owner: Stage::L1.agent().to_string(),
        feedback_link,
        folder_link,
        last_updated: Utc::now(),
        candidate_key: report.candidate_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{fixture, put_l1_candidate, ScriptedScorer};
    use crate::pipeline::RunState;
    use uuid::Uuid;

    fn run(evaluated: usize, advanced: usize) -> RunState {
        RunState {
            run_id: Uuid::new_v4(),
            evaluated,
            advanced,
        }
    }

    fn folder(name: &str) -> Folder {
        Folder {
            id: format!("L1 Pending Review/IT Support/{name}"),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_capacity_cap_needs_five_evaluated() {
        assert!(!exceeds_capacity(&run(0, 0)));
        assert!(!exceeds_capacity(&run(3, 3)));
        // 5th candidate, 3 already moved: 4/5 > 0.45
        assert!(exceeds_capacity(&run(4, 3)));
        // 5th candidate, 1 already moved: 2/5 <= 0.45
        assert!(!exceeds_capacity(&run(4, 1)));
    }

    #[tokio::test]
    async fn test_move_writes_result_and_relocates() {
        let fx = fixture(ScriptedScorer::default().l1("Priya Shah", 82.0, &[]));
        put_l1_candidate(&fx.store, "Priya Shah");

        let report = review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Priya Shah"))
            .await
            .unwrap();
        assert_eq!(report.outcome, OutcomeKind::Advanced);
        assert_eq!(report.status, "SEND_TO_L2");
        assert_eq!(report.folder_id, "L2 Pending Review/IT Support/Priya Shah");

        let base = "L2 Pending Review/IT Support/Priya Shah";
        let result = fx.store.get_json(&format!("{base}/l1_result.json")).unwrap();
        assert_eq!(result["overall_score"], 82.0);
        assert_eq!(result["pipeline_recommendation"], "MOVE");
        let status = fx.store.get_json(&format!("{base}/l1_status.json")).unwrap();
        assert_eq!(status["status"], "SEND_TO_L2");
        assert!(fx.store.keys_under("L1 Pending Review/IT Support/Priya Shah").is_empty());

        let rows = fx.sheets.rows("dash", "IT Support");
        assert_eq!(rows[1][2], "Move to L2");
        assert_eq!(rows[1][4], "High");
        assert_eq!(fx.sheets.rows("dash", "Decisions").len(), 2);
    }

    #[tokio::test]
    async fn test_failed_move_leaves_no_result_or_log_row() {
        let fx = fixture(ScriptedScorer::default().l1("Priya Shah", 82.0, &[]));
        put_l1_candidate(&fx.store, "Priya Shah");
        fx.store.fail_moves();

        let err = review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Priya Shah"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_ERROR");

        let base = "L1 Pending Review/IT Support/Priya Shah";
        assert!(fx.store.get(&format!("{base}/l1_result.json")).is_none());
        let status = fx.store.get_json(&format!("{base}/l1_status.json")).unwrap();
        assert_eq!(status["status"], "ROUTING_FAILED");
        assert!(fx.store.keys_under("L2 Pending Review/IT Support").is_empty());
        assert!(fx.sheets.rows("dash", "Decisions").is_empty());
        assert!(fx.sheets.rows("dash", "IT Support").is_empty());
    }

    #[tokio::test]
    async fn test_reject_moves_to_rejected_folder() {
        let fx = fixture(ScriptedScorer::default().l1("Arun Rao", 30.0, &[]));
        put_l1_candidate(&fx.store, "Arun Rao");

        let report = review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Arun Rao"))
            .await
            .unwrap();
        assert_eq!(report.outcome, OutcomeKind::Rejected);
        assert!(fx
            .store
            .get("Profiles/L1 Rejected/IT Support/Arun Rao/l1_result.json")
            .is_some());
    }

    #[tokio::test]
    async fn test_hold_stays_in_place_with_status() {
        let fx = fixture(ScriptedScorer::default().l1("Meera Iyer", 55.0, &[]));
        put_l1_candidate(&fx.store, "Meera Iyer");

        let report = review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Meera Iyer"))
            .await
            .unwrap();
        assert_eq!(report.hold_type, Some(HoldType::Ambiguous));
        let status = fx
            .store
            .get_json("L1 Pending Review/IT Support/Meera Iyer/l1_status.json")
            .unwrap();
        assert_eq!(status["status"], "HOLD");
        assert_eq!(status["detail"], "Awaiting recruiter review");
    }

    #[tokio::test]
    async fn test_missing_transcript_holds_without_scoring() {
        let fx = fixture(ScriptedScorer::default().failing("Ravi Kumar"));
        fx.store.put("L1 Pending Review/IT Support/Ravi Kumar/resume.txt", "resume");
        fx.store.put("L1 Pending Review/IT Support/Ravi Kumar/jd.txt", "jd");

        let report = review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Ravi Kumar"))
            .await
            .unwrap();
        assert_eq!(report.status, STATUS_MISSING_TRANSCRIPT);
        assert_eq!(report.hold_type, Some(HoldType::MissingL1Transcript));
        assert!(report.score.is_none());
    }

    #[tokio::test]
    async fn test_zero_documents_hold_incomplete() {
        let fx = fixture(ScriptedScorer::default().l1("Ghost", 99.0, &[]));
        fx.store.put("L1 Pending Review/IT Support/Ghost/photo.png", "p");

        let report = review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Ghost"))
            .await
            .unwrap();
        assert_eq!(report.outcome, OutcomeKind::Held);
        assert_eq!(report.hold_type, Some(HoldType::DataIncomplete));
        assert_eq!(report.status, STATUS_DATA_INCOMPLETE);
    }

    #[tokio::test]
    async fn test_capacity_turns_move_into_backup_hold() {
        let fx = fixture(ScriptedScorer::default().l1("Priya Shah", 90.0, &[]));
        put_l1_candidate(&fx.store, "Priya Shah");

        let report = review_l1(&fx.ctx, &run(4, 3), "IT Support", &folder("Priya Shah"))
            .await
            .unwrap();
        assert_eq!(report.hold_type, Some(HoldType::CapacityBackup));
        assert_eq!(report.folder_id, "L1 Pending Review/IT Support/Priya Shah");
    }

    #[tokio::test]
    async fn test_memory_receives_event() {
        let fx = fixture(ScriptedScorer::default().l1("Priya Shah", 82.0, &["Night shifts"]));
        put_l1_candidate(&fx.store, "Priya Shah");

        review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Priya Shah"))
            .await
            .unwrap();
        let report: NormalizationReport = serde_json::from_value(
            fx.store
                .get_json("L2 Pending Review/IT Support/Priya Shah/normalization_report.json")
                .unwrap(),
        )
        .unwrap();
        let events = fx.memory.events_for(report.candidate_id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decision, "SEND_TO_L2");
    }

    #[tokio::test]
    async fn test_empty_text_holds_incomplete() {
        let fx = fixture(ScriptedScorer::default());
        fx.store.put("L1 Pending Review/IT Support/Blank/resume.txt", "   ");
        fx.store.put("L1 Pending Review/IT Support/Blank/jd.txt", "jd");
        fx.store.put("L1 Pending Review/IT Support/Blank/interview_transcript.txt", "t");

        let report = review_l1(&fx.ctx, &run(0, 0), "IT Support", &folder("Blank"))
            .await
            .unwrap();
        assert_eq!(report.detail, "document_text_empty");
    }
}
