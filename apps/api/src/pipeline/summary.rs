use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FolderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    L1,
    L2,
}

impl Stage {
    pub fn agent(&self) -> &'static str {
        match self {
            Stage::L1 => "Riva",
            Stage::L2 => "Arjun",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::L1 => "L1",
            Stage::L2 => "L2",
        }
    }

    /// Folder the stage reads candidates from.
    pub fn source(&self) -> FolderKind {
        match self {
            Stage::L1 => FolderKind::L1Pending,
            Stage::L2 => FolderKind::L2Pending,
        }
    }
}

/// Why a candidate was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldType {
    MissingL1Transcript,
    MissingL2Transcript,
    DataIncomplete,
    SkippedNoL2,
    Ambiguous,
    ExecReview,
    CapacityBackup,
}

/// Coarse reason code surfaced to recruiters and chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReasonCode {
    MissingNoncriticalInfo,
    ManualReviewRequired,
    BackupForL2Capacity,
}

impl HoldType {
    pub fn reason_code(&self) -> HoldReasonCode {
        match self {
            HoldType::MissingL1Transcript
            | HoldType::MissingL2Transcript
            | HoldType::DataIncomplete
            | HoldType::SkippedNoL2 => HoldReasonCode::MissingNoncriticalInfo,
            HoldType::Ambiguous | HoldType::ExecReview => HoldReasonCode::ManualReviewRequired,
            HoldType::CapacityBackup => HoldReasonCode::BackupForL2Capacity,
        }
    }

    /// Next-action text for the dashboard.
    pub fn sheet_description(&self) -> &'static str {
        match self {
            HoldType::CapacityBackup => "Hold – backup for L2 capacity",
            HoldType::MissingL1Transcript => "Hold – missing L1 transcript",
            HoldType::MissingL2Transcript => "Hold – missing L2 transcript",
            HoldType::DataIncomplete => "Hold – missing required documents",
            HoldType::SkippedNoL2 => "Hold – missing information",
            HoldType::Ambiguous => "Hold – manual review (ambiguous signals)",
            HoldType::ExecReview => "Hold – manual review required",
        }
    }
}

impl HoldReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldReasonCode::MissingNoncriticalInfo => "missing_noncritical_info",
            HoldReasonCode::ManualReviewRequired => "manual_review_required",
            HoldReasonCode::BackupForL2Capacity => "backup_for_l2_capacity",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            HoldReasonCode::MissingNoncriticalInfo => "missing non-critical info",
            HoldReasonCode::ManualReviewRequired => "manual review required",
            HoldReasonCode::BackupForL2Capacity => "backup pool for L2 capacity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Advanced,
    Rejected,
    Held,
}

/// What happened to one candidate in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub candidate_name: String,
    pub role: String,
    pub folder_id: String,
    pub folder_link: String,
    pub outcome: OutcomeKind,
    /// Status code written to the stage status file, e.g. `SEND_TO_L2`.
    pub status: String,
    pub detail: String,
    #[serde(default)]
    pub hold_type: Option<HoldType>,
    /// Unit score when the candidate was scored.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub l1_vs_l2: Option<String>,
    /// Non-fatal problems hit while recording the outcome.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CandidateReport {
    pub fn hold_reason(&self) -> Option<HoldReasonCode> {
        self.hold_type.map(|h| h.reason_code())
    }

    fn was_scored(&self) -> bool {
        self.score.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateError {
    pub candidate_name: String,
    pub role: String,
    pub folder_id: String,
    pub folder_link: String,
    pub error_code: String,
    pub error_message: String,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_seen: usize,
    pub evaluated: usize,
    pub advanced: usize,
    pub rejected: usize,
    pub held: usize,
    pub hold_manual_review: usize,
    pub hold_backup: usize,
    pub hold_missing_transcript: usize,
    pub hold_data_incomplete: usize,
    pub errors: usize,
    pub error_details: Vec<CandidateError>,
    pub warnings: Vec<String>,
    pub candidates: Vec<CandidateReport>,
}

impl BatchSummary {
    pub fn new(stage: Stage, run_id: Uuid) -> Self {
        Self {
            run_id,
            stage,
            started_at: Utc::now(),
            finished_at: None,
            total_seen: 0,
            evaluated: 0,
            advanced: 0,
            rejected: 0,
            held: 0,
            hold_manual_review: 0,
            hold_backup: 0,
            hold_missing_transcript: 0,
            hold_data_incomplete: 0,
            errors: 0,
            error_details: Vec::new(),
            warnings: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn record(&mut self, mut report: CandidateReport) {
        self.warnings.append(&mut report.warnings);
        if report.was_scored() {
            self.evaluated += 1;
        }
        match report.outcome {
            OutcomeKind::Advanced => self.advanced += 1,
            OutcomeKind::Rejected => self.rejected += 1,
            OutcomeKind::Held => {
                self.held += 1;
                match report.hold_type {
                    Some(HoldType::MissingL1Transcript | HoldType::MissingL2Transcript) => {
                        self.hold_missing_transcript += 1
                    }
                    Some(HoldType::DataIncomplete | HoldType::SkippedNoL2) => {
                        self.hold_data_incomplete += 1
                    }
                    Some(HoldType::CapacityBackup) => self.hold_backup += 1,
                    Some(HoldType::Ambiguous | HoldType::ExecReview) | None => {
                        self.hold_manual_review += 1
                    }
                }
            }
        }
        self.candidates.push(report);
    }

    pub fn record_error(&mut self, error: CandidateError) {
        self.errors += 1;
        self.error_details.push(error);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn reports_with(&self, outcome: OutcomeKind) -> impl Iterator<Item = &CandidateReport> {
        self.candidates.iter().filter(move |c| c.outcome == outcome)
    }
}
