//! L2 deep dive ("Arjun"): runs on folders in L2 pending and routes them to
//! final selection, L2 rejection or an executive-review hold.

use chrono::Utc;
use tracing::info;

use crate::config::FolderKind;
use crate::decision::l2::{decide_l2, L2Outcome, L2Signals};
use crate::decision::{confidence, confidence_band};
use crate::decision_log::{DecisionDetail, DecisionEntry};
use crate::errors::AppError;
use crate::memory::{EvaluationMemory, FinalDecision};
use crate::normalizer::{ArtifactEntry, NormalizationReport, L2_RESULT_FILE};
use crate::pipeline::common::{self, GatingHold, Subject};
use crate::pipeline::records::{read_l1_result, L1ResultRecord, L2ResultRecord};
use crate::pipeline::summary::{CandidateReport, HoldType, OutcomeKind, Stage};
use crate::pipeline::{PipelineContext, RunState};
use crate::scoring::models::ArjunL2Result;
use crate::scoring::L2Input;
use crate::sheets::dashboard::DashboardRow;
use crate::storage::Folder;

pub const STATUS_MISSING_TRANSCRIPT: &str = "ON_HOLD_MISSING_L2_TRANSCRIPT";
pub const STATUS_DATA_INCOMPLETE: &str = "DATA_INCOMPLETE_L2";
const HOLD_DETAIL: &str = "Awaiting L2 reviewer";
/// Score points (0-100) that count as a real change between stages.
const COMPARISON_MARGIN: f64 = 5.0;

pub const FINAL_HIRE: &str = "Final Hire";
pub const FINAL_REJECT: &str = "Final Reject";
pub const NEXT_ACTION_HIRE: &str = "Send offer & start onboarding";
pub const NEXT_ACTION_REJECT: &str = "Share rejection feedback";

fn status(outcome: L2Outcome) -> &'static str {
    match outcome {
        L2Outcome::Advance => "HIRE",
        L2Outcome::Reject => "REJECT",
        L2Outcome::HoldExecReview | L2Outcome::HoldDataIncomplete => "HOLD",
    }
}

fn hold_type(outcome: L2Outcome) -> Option<HoldType> {
    match outcome {
        L2Outcome::HoldExecReview => Some(HoldType::ExecReview),
        L2Outcome::HoldDataIncomplete => Some(HoldType::DataIncomplete),
        _ => None,
    }
}

fn outcome_kind(outcome: L2Outcome) -> OutcomeKind {
    match outcome {
        L2Outcome::Advance => OutcomeKind::Advanced,
        L2Outcome::Reject => OutcomeKind::Rejected,
        _ => OutcomeKind::Held,
    }
}

/// Final status and next action for decisions that close the pipeline.
fn final_status(outcome: L2Outcome) -> Option<(&'static str, &'static str)> {
    match outcome {
        L2Outcome::Advance => Some((FINAL_HIRE, NEXT_ACTION_HIRE)),
        L2Outcome::Reject => Some((FINAL_REJECT, NEXT_ACTION_REJECT)),
        _ => None,
    }
}

/// IMPROVED / REGRESSED / CONSISTENT on 0-100 scores, N/A without an L1 score.
pub fn compare_stages(l1_score: Option<f64>, l2_score: f64) -> &'static str {
    match l1_score {
        Some(l1) if l1.is_finite() && l2_score.is_finite() => {
            let delta = l2_score - l1;
            if delta >= COMPARISON_MARGIN {
                "IMPROVED"
            } else if delta <= -COMPARISON_MARGIN {
                "REGRESSED"
            } else {
                "CONSISTENT"
            }
        }
        _ => "N/A",
    }
}

fn l1_summary(record: &L1ResultRecord) -> String {
    let mut summary = format!(
        "L1 score {:.0}/100, recommendation {}.",
        record.overall_score, record.recommendation
    );
    if !record.match_summary.trim().is_empty() {
        summary.push(' ');
        summary.push_str(record.match_summary.trim());
    }
    if !record.risks.is_empty() {
        summary.push_str(&format!(" Risks noted: {}.", record.risks.join("; ")));
    }
    summary
}

/// Reviews one candidate folder sitting in the L2 pending folder.
pub async fn review_l2(
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
        "Starting L2 review"
    );
    let store = ctx.store.as_ref();

    // Step 1: Normalize, load the L1 record and gate
    let report = common::prepare_folder(ctx, folder, role).await?;
    let previous = read_l1_result(store, &folder.id).await?;
    let subject = Subject {
        role,
        folder,
        report: report.as_ref(),
    };
    let Some(report) = report.as_ref() else {
        let hold = GatingHold {
            hold_type: HoldType::DataIncomplete,
            status: STATUS_DATA_INCOMPLETE,
            detail: "normalization_report_missing",
        };
        return common::hold_unscored(ctx, run, Stage::L2, subject, previous.as_ref(), hold)
            .await;
    };
    let (resume, jd, transcript) = match gate(report) {
        Ok(documents) => documents,
        Err(hold) => {
            return common::hold_unscored(ctx, run, Stage::L2, subject, previous.as_ref(), hold)
                .await
        }
    };

    // Step 2: Extract document text
    let resume_text = common::document_text(store, resume).await?;
    let jd_text = common::document_text(store, jd).await?;
    let transcript_text = common::document_text(store, transcript).await?;
    if resume_text.is_empty() || jd_text.is_empty() || transcript_text.is_empty() {
        let hold = GatingHold {
            hold_type: HoldType::DataIncomplete,
            status: STATUS_DATA_INCOMPLETE,
            detail: "document_text_empty",
        };
        return common::hold_unscored(ctx, run, Stage::L2, subject, previous.as_ref(), hold)
            .await;
    }

    // Step 3: Score
    let memory_context = ctx.memory.context_for(report.candidate_id, role).await;
    let result = ctx
        .scorer
        .score_l2(&L2Input {
            candidate_name: folder.name.clone(),
            role: role.to_string(),
            jd: jd_text.clone(),
            resume: resume_text.clone(),
            transcript: transcript_text.clone(),
            l1_summary: previous.as_ref().map(l1_summary),
            memory_context,
        })
        .await?;

    // Step 4: Map to an outcome
    let notes = result.gating_notes();
    let decision = decide_l2(
        &ctx.l2_policy,
        &L2Signals {
            final_score: result.final_score.unwrap_or(f64::NAN),
            communication_depth: &result.communication_depth,
            leadership_assessment: &result.leadership_assessment,
            recommendation: &result.final_recommendation,
            notes: &notes,
        },
    );
    let outcome = decision.outcome;
    let confidence = confidence(decision.score);
    let l2_points = (decision.score * 100.0).round();
    let comparison = compare_stages(previous.as_ref().map(|r| r.overall_score), l2_points);
    info!(
        correlation_id = %run.run_id,
        candidate_name = %folder.name,
        score = decision.score,
        outcome = status(outcome),
        comparison,
        "L2 decision: {}",
        decision.reason
    );

    // Step 5: Route the folder; the result and log row follow only a completed move
    let destination = match outcome {
        L2Outcome::Advance => Some(FolderKind::FinalSelected),
        L2Outcome::Reject => Some(FolderKind::L2Rejected),
        _ => None,
    };
    let current = common::relocate(ctx, run, Stage::L2, folder, destination, role).await?;

    // Step 6: Persist the result where the folder landed, then the decision log row
    let record = L2ResultRecord {
        candidate_id: Some(report.candidate_id),
        final_score: l2_points,
        confidence,
        final_recommendation: status(outcome).to_string(),
        outcome: Some(outcome),
        hold_type: hold_type(outcome),
        l2_summary: result.l2_summary.clone(),
        l1_l2_comparison: comparison.to_string(),
        strengths: result.strengths.clone(),
        risk_flags: result.risk_flags.clone(),
        rationale: if result.rationale.trim().is_empty() {
            decision.reason.clone()
        } else {
            result.rationale.clone()
        },
        evaluated_at: Some(Utc::now()),
    };
    let value = serde_json::to_value(&record).map_err(|e| AppError::Internal(e.into()))?;
    let result_file = store.write_json(&current.id, L2_RESULT_FILE, &value).await?;
    let feedback_link = store.file_link(&result_file.id);

    let (final_label, next_action) = final_status(outcome).unwrap_or(("On Hold", HOLD_DETAIL));
    let mut warnings = Vec::new();
    common::log_decision(
        ctx,
        &DecisionEntry {
            candidate_id: report.candidate_id.to_string(),
            candidate_name: folder.name.clone(),
            role: role.to_string(),
            reviewed_at: Utc::now(),
            detail: DecisionDetail::L2 {
                score: decision.score,
                decision: status(outcome).to_string(),
                summary: result.l2_summary.clone(),
                final_status: final_label.to_string(),
                final_summary: next_action.to_string(),
            },
        },
        &mut warnings,
    )
    .await;

    let status_detail = if destination.is_some() {
        decision.reason.as_str()
    } else {
        HOLD_DETAIL
    };
    common::write_status(ctx, run, Stage::L2, &current.id, status(outcome), status_detail)
        .await?;

    // Step 7: Dashboard, final decision and memory
    let folder_link = store.folder_link(&current.id);
    let row = dashboard_row(
        &folder.name,
        report,
        &result,
        &record,
        previous.as_ref(),
        outcome,
        [feedback_link, folder_link.clone()],
    );
    common::upsert_dashboard(ctx, role, &row, &mut warnings).await;

    if let Some((final_label, next_action)) = final_status(outcome) {
        ctx.memory
            .record_final_decision(&FinalDecision {
                candidate_id: report.candidate_id,
                role: role.to_string(),
                candidate_name: folder.name.clone(),
                final_status: final_label.to_string(),
                next_action: next_action.to_string(),
                decided_at: Utc::now(),
            })
            .await;
    }

    ctx.memory
        .remember(&EvaluationMemory {
            candidate_id: report.candidate_id,
            candidate_name: folder.name.clone(),
            role: role.to_string(),
            run_id: run.run_id,
            stage: Stage::L2.as_str().to_string(),
            agent: Stage::L2.agent().to_string(),
            inputs_snapshot: common::inputs_snapshot(&resume_text, &jd_text, &transcript_text),
            score: decision.score,
            decision: status(outcome).to_string(),
            confidence,
            strengths: result.strengths.clone(),
            concerns: result.concerns.clone(),
            advanced: outcome == L2Outcome::Advance,
            rejected: outcome == L2Outcome::Reject,
            artifacts: serde_json::to_value(&report.artifacts_summary).unwrap_or_default(),
        })
        .await;

    Ok(CandidateReport {
        candidate_name: folder.name.clone(),
        role: role.to_string(),
        folder_id: current.id,
        folder_link,
        outcome: outcome_kind(outcome),
        status: status(outcome).to_string(),
        detail: decision.reason,
        hold_type: hold_type(outcome),
        score: Some(decision.score),
        l1_vs_l2: Some(comparison.to_string()),
        warnings,
    })
}

/// L2 gating: any L2 material at all, then the L2 transcript, then resume and JD.
fn gate(
    report: &NormalizationReport,
) -> Result<(&ArtifactEntry, &ArtifactEntry, &ArtifactEntry), GatingHold> {
    let slots = &report.artifacts;
    if slots.resume.is_none() && slots.jd.is_none() && slots.l2_transcript.is_none() {
        return Err(GatingHold {
            hold_type: HoldType::SkippedNoL2,
            status: STATUS_DATA_INCOMPLETE,
            detail: "No L2 artifacts found",
        });
    }
    let Some(transcript) = &slots.l2_transcript else {
        return Err(GatingHold {
            hold_type: HoldType::MissingL2Transcript,
            status: STATUS_MISSING_TRANSCRIPT,
            detail: "L2 transcript missing",
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

fn dashboard_row(
    name: &str,
    report: &NormalizationReport,
    result: &ArjunL2Result,
    record: &L2ResultRecord,
    previous: Option<&L1ResultRecord>,
    outcome: L2Outcome,
    [feedback_link, folder_link]: [String; 2],
) -> DashboardRow {
    let (ai_status, l2_outcome, next_action) = match outcome {
        L2Outcome::Advance if record.final_score >= 90.0 => {
            ("Shortlist", "Strong Yes", NEXT_ACTION_HIRE)
        }
        L2Outcome::Advance => ("Shortlist", "Yes", NEXT_ACTION_HIRE),
        L2Outcome::Reject => ("Reject", "No", "Reject & Send Email"),
        L2Outcome::HoldExecReview => ("On Hold", "Lean Yes", "Need Human Review"),
        L2Outcome::HoldDataIncomplete => (
            "On Hold",
            "Hold",
            HoldType::DataIncomplete.sheet_description(),
        ),
    };
    let mut concerns = result.concerns.clone();
    concerns.extend(result.risk_flags.iter().cloned());
    DashboardRow {
        candidate_name: name.to_string(),
        current_stage: "L2 Completed".to_string(),
        ai_status: ai_status.to_string(),
        recommendation_detail: if record.l2_summary.trim().is_empty() {
            record.rationale.clone()
        } else {
            record.l2_summary.clone()
        },
        confidence: confidence_band(record.confidence).to_string(),
        strengths: result.strengths.clone(),
        concerns,
        l1_outcome: previous
            .map(|r| r.outcome_label().to_string())
            .unwrap_or_default(),
        l2_outcome: l2_outcome.to_string(),
        next_action: next_action.to_string(),
        owner: Stage::L2.agent().to_string(),
        feedback_link,
        folder_link,
        last_updated: Utc::now(),
        candidate_key: report.candidate_id.to_string(),
    }
}
