//! Steps shared by both review stages: folder preparation, gating holds,
//! status files, routing and the sheet writes.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::FolderKind;
use crate::decision_log::DecisionEntry;
use crate::errors::AppError;
use crate::normalizer::{
    load_report, normalize_candidate_folder, ArtifactEntry, NormalizationReport, L1_STATUS_FILE,
    L2_STATUS_FILE,
};
use crate::pipeline::records::{L1ResultRecord, StatusRecord};
use crate::pipeline::summary::{CandidateReport, HoldType, OutcomeKind, Stage};
use crate::pipeline::{PipelineContext, RunState};
use crate::sheets::dashboard::DashboardRow;
use crate::storage::text::extract_text;
use crate::storage::{FileStore, Folder, StorageError};

pub(crate) fn status_file(stage: Stage) -> &'static str {
    match stage {
        Stage::L1 => L1_STATUS_FILE,
        Stage::L2 => L2_STATUS_FILE,
    }
}

/// Normalizes the folder. When normalization fails the last written report is used.
pub(crate) async fn prepare_folder(
    ctx: &PipelineContext,
    folder: &Folder,
    role: &str,
) -> Result<Option<NormalizationReport>, StorageError> {
    match normalize_candidate_folder(ctx.store.as_ref(), folder, role).await {
        Ok(report) => Ok(Some(report)),
        Err(e) => {
            warn!(folder_id = %folder.id, "Normalization failed, falling back to stored report: {e}");
            load_report(ctx.store.as_ref(), &folder.id).await
        }
    }
}

pub(crate) async fn write_status(
    ctx: &PipelineContext,
    run: &RunState,
    stage: Stage,
    folder_id: &str,
    status: &str,
    detail: &str,
) -> Result<(), StorageError> {
    let record = StatusRecord {
        status: status.to_string(),
        detail: detail.to_string(),
        updated_at: Utc::now(),
        correlation_id: run.run_id,
    };
    let value = serde_json::to_value(&record)
        .map_err(|e| StorageError::Backend(format!("serialize status: {e}")))?;
    ctx.store
        .write_json(folder_id, status_file(stage), &value)
        .await?;
    Ok(())
}

pub(crate) async fn document_text(
    store: &dyn FileStore,
    entry: &ArtifactEntry,
) -> Result<String, StorageError> {
    extract_text(store, &entry.to_stored_file()).await
}

/// Text of an optional document; unreadable or empty documents count as absent.
pub(crate) async fn optional_text(
    store: &dyn FileStore,
    entry: Option<&ArtifactEntry>,
) -> Option<String> {
    let entry = entry?;
    match document_text(store, entry).await {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            warn!("Skipping unreadable optional document '{}': {e}", entry.name);
            None
        }
    }
}

/// Moves the folder under `destination/<role>`.
pub(crate) async fn route(
    ctx: &PipelineContext,
    folder: &Folder,
    destination: FolderKind,
    role: &str,
) -> Result<Folder, StorageError> {
    let parent = ctx.folders.role_folder(destination, role);
    let moved = ctx.store.move_folder(&folder.id, &parent).await?;
    info!(from = %folder.id, to = %moved.id, "Moved candidate folder");
    Ok(moved)
}

pub(crate) const STATUS_ROUTING_FAILED: &str = "ROUTING_FAILED";

/// Moves the folder when there is a destination. A failed move leaves a
/// `ROUTING_FAILED` status in the source folder and nothing else.
pub(crate) async fn relocate(
    ctx: &PipelineContext,
    run: &RunState,
    stage: Stage,
    folder: &Folder,
    destination: Option<FolderKind>,
    role: &str,
) -> Result<Folder, AppError> {
    let Some(kind) = destination else {
        return Ok(folder.clone());
    };
    match route(ctx, folder, kind, role).await {
        Ok(moved) => Ok(moved),
        Err(e) => {
            warn!(
                correlation_id = %run.run_id,
                folder_id = %folder.id,
                "Folder move failed, candidate stays in place: {e}"
            );
            let detail = format!(
                "Move to '{}' failed: {e}",
                ctx.folders.role_folder(kind, role)
            );
            if let Err(status_err) =
                write_status(ctx, run, stage, &folder.id, STATUS_ROUTING_FAILED, &detail).await
            {
                warn!(folder_id = %folder.id, "Could not record routing failure: {status_err}");
            }
            Err(e.into())
        }
    }
}

/// Dashboard key: the stable candidate id, or the folder id before the first report exists.
pub(crate) fn candidate_key(folder: &Folder, report: Option<&NormalizationReport>) -> String {
    report
        .map(|r| r.candidate_id.to_string())
        .unwrap_or_else(|| folder.id.clone())
}

pub(crate) async fn upsert_dashboard(
    ctx: &PipelineContext,
    role: &str,
    row: &DashboardRow,
    warnings: &mut Vec<String>,
) {
    let Some(dashboard) = &ctx.dashboard else {
        return;
    };
    if let Err(e) = dashboard.upsert(role, row).await {
        warn!(candidate_name = %row.candidate_name, "Dashboard update failed: {e}");
        warnings.push(format!(
            "Dashboard update failed for {}: {e}",
            row.candidate_name
        ));
    }
}

pub(crate) async fn log_decision(
    ctx: &PipelineContext,
    entry: &DecisionEntry,
    warnings: &mut Vec<String>,
) {
    let Some(log) = &ctx.decision_log else {
        return;
    };
    if let Err(e) = log.append(entry).await {
        warn!(candidate_name = %entry.candidate_name, "Decision log append failed: {e}");
        warnings.push(format!(
            "Decision log append failed for {}: {e}",
            entry.candidate_name
        ));
    }
}

/// A deterministic hold raised before the scorer is called.
pub(crate) struct GatingHold {
    pub hold_type: HoldType,
    pub status: &'static str,
    pub detail: &'static str,
}

/// The candidate folder under review.
#[derive(Clone, Copy)]
pub(crate) struct Subject<'a> {
    pub role: &'a str,
    pub folder: &'a Folder,
    pub report: Option<&'a NormalizationReport>,
}

/// Records a gating hold: status file and dashboard row, folder left in place.
pub(crate) async fn hold_unscored(
    ctx: &PipelineContext,
    run: &RunState,
    stage: Stage,
    subject: Subject<'_>,
    previous_l1: Option<&L1ResultRecord>,
    hold: GatingHold,
) -> Result<CandidateReport, AppError> {
    let Subject {
        role,
        folder,
        report,
    } = subject;
    info!(
        correlation_id = %run.run_id,
        candidate_name = %folder.name,
        role = %role,
        folder_id = %folder.id,
        status = hold.status,
        "Candidate held before scoring: {}",
        hold.detail
    );
    write_status(ctx, run, stage, &folder.id, hold.status, hold.detail).await?;

    let folder_link = ctx.store.folder_link(&folder.id);
    let (l1_outcome, l2_outcome) = match stage {
        Stage::L1 => ("Hold".to_string(), String::new()),
        Stage::L2 => (
            previous_l1
                .map(|r| r.outcome_label().to_string())
                .unwrap_or_default(),
            "Hold".to_string(),
        ),
    };
    let row = DashboardRow {
        candidate_name: folder.name.clone(),
        current_stage: format!("{} On Hold", stage.as_str()),
        ai_status: "Hold".to_string(),
        recommendation_detail: hold.detail.to_string(),
        confidence: String::new(),
        strengths: Vec::new(),
        concerns: Vec::new(),
        l1_outcome,
        l2_outcome,
        next_action: hold.hold_type.sheet_description().to_string(),
        owner: stage.agent().to_string(),
        feedback_link: String::new(),
        folder_link: folder_link.clone(),
        last_updated: Utc::now(),
        candidate_key: candidate_key(folder, report),
    };
    let mut warnings = Vec::new();
    upsert_dashboard(ctx, role, &row, &mut warnings).await;

    Ok(CandidateReport {
        candidate_name: folder.name.clone(),
        role: role.to_string(),
        folder_id: folder.id.clone(),
        folder_link,
        outcome: OutcomeKind::Held,
        status: hold.status.to_string(),
        detail: hold.detail.to_string(),
        hold_type: Some(hold.hold_type),
        score: None,
        l1_vs_l2: None,
        warnings,
    })
}

/// Resume, JD and transcript text joined for the memory input hash.
pub(crate) fn inputs_snapshot(resume: &str, jd: &str, transcript: &str) -> String {
    format!("{resume}\n---\n{jd}\n---\n{transcript}")
}
