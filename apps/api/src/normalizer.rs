//! Candidate folder normalization.
//!
//! Classifies every document in a candidate folder into a fixed set of artifact
//! slots, renames the JD to its canonical name and writes `normalization_report.json`.
//! The report is rewritten on every run and is the only input the gating step reads.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::storage::{find_named, read_json, FileStore, Folder, StorageError, StoredFile};

pub const REPORT_FILE: &str = "normalization_report.json";
pub const L1_RESULT_FILE: &str = "l1_result.json";
pub const L2_RESULT_FILE: &str = "l2_result.json";
pub const L1_STATUS_FILE: &str = "l1_status.json";
pub const L2_STATUS_FILE: &str = "l2_status.json";
pub const ARTIFACT_VERSION: &str = "candidate_artifacts_v2";

/// Files written by the pipelines themselves; never classified as candidate documents.
const SYSTEM_FILES: [&str; 5] = [
    REPORT_FILE,
    L1_RESULT_FILE,
    L2_RESULT_FILE,
    L1_STATUS_FILE,
    L2_STATUS_FILE,
];

const TRANSCRIPT_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "md"];
const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mov", "wmv", "webm", "m4a", "mp3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Resume,
    Jd,
    Transcript,
    Feedback,
    Video,
    Unknown,
}

// ────────────────────────────────────────────────────────────────────────────
// Report model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub file_id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
}

impl ArtifactEntry {
    fn from_file(file: &StoredFile) -> Self {
        Self {
            file_id: file.id.clone(),
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            canonical_name: None,
        }
    }

    pub fn to_stored_file(&self) -> StoredFile {
        StoredFile {
            id: self.file_id.clone(),
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSlots {
    pub resume: Option<ArtifactEntry>,
    pub jd: Option<ArtifactEntry>,
    pub l1_transcript: Option<ArtifactEntry>,
    pub l1_feedback: Option<ArtifactEntry>,
    pub l1_video: Option<ArtifactEntry>,
    pub l2_transcript: Option<ArtifactEntry>,
    pub l2_feedback: Option<ArtifactEntry>,
    pub l2_video: Option<ArtifactEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactsSummary {
    pub resume: bool,
    pub jd: bool,
    pub l1_transcript: bool,
    pub l1_feedback: bool,
    pub l1_video: bool,
    pub l2_transcript: bool,
    pub l2_feedback: bool,
    pub l2_video: bool,
}

impl ArtifactSlots {
    pub fn summary(&self) -> ArtifactsSummary {
        ArtifactsSummary {
            resume: self.resume.is_some(),
            jd: self.jd.is_some(),
            l1_transcript: self.l1_transcript.is_some(),
            l1_feedback: self.l1_feedback.is_some(),
            l1_video: self.l1_video.is_some(),
            l2_transcript: self.l2_transcript.is_some(),
            l2_feedback: self.l2_feedback.is_some(),
            l2_video: self.l2_video.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary() == ArtifactsSummary::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Stable across folder moves and re-normalizations.
    pub candidate_id: Uuid,
    pub candidate_folder_id: String,
    pub candidate_name: String,
    pub role_name: String,
    pub normalized_at: DateTime<Utc>,
    pub jd_canonical_name: String,
    pub artifact_version: String,
    pub artifacts: ArtifactSlots,
    pub extras: Vec<ArtifactEntry>,
    pub artifacts_summary: ArtifactsSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

fn resume_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(resume|cv|curriculum|biodata|profile)\b").expect("resume regex compiles")
    })
}

fn jd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(jd|job description|role|responsibilities)\b").expect("jd regex compiles")
    })
}

fn feedback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(feedback|interviewer|review|observation|evaluation)\b")
            .expect("feedback regex compiles")
    })
}

fn transcript_strong_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(first round interview invite|interview invite|interview summary|meet transcript|google meet|interview transcript|interview notes|first round interview)",
        )
        .expect("transcript regex compiles")
    })
}

fn transcript_weak_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(interview|meet|meeting|discussion|conversation|transcript)\b")
            .expect("transcript regex compiles")
    })
}

/// Lowercased file stem with separators flattened to spaces.
fn match_key(name: &str) -> String {
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    stem.to_lowercase()
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '.') { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_video(file: &StoredFile) -> bool {
    VIDEO_EXTENSIONS.contains(&file.extension().as_str())
        || file.mime_type.starts_with("video/")
        || file.mime_type.starts_with("audio/")
}

fn is_text_document(file: &StoredFile) -> bool {
    TRANSCRIPT_EXTENSIONS.contains(&file.extension().as_str())
}

/// Classifies a file by name. Order: video, resume, JD, feedback, transcript.
pub fn classify(file: &StoredFile) -> ArtifactKind {
    if is_video(file) {
        return ArtifactKind::Video;
    }
    let key = match_key(&file.name);
    if resume_re().is_match(&key) {
        ArtifactKind::Resume
    } else if jd_re().is_match(&key) {
        ArtifactKind::Jd
    } else if feedback_re().is_match(&key) {
        ArtifactKind::Feedback
    } else if is_text_document(file)
        && (transcript_strong_re().is_match(&key) || transcript_weak_re().is_match(&key))
    {
        ArtifactKind::Transcript
    } else {
        ArtifactKind::Unknown
    }
}

fn is_l2_artifact(name: &str) -> bool {
    match_key(name).contains("l2")
}

pub fn is_system_file(name: &str) -> bool {
    SYSTEM_FILES.contains(&name)
}

/// `JD_IT_Support.pdf` for role "IT Support".
pub fn canonical_jd_name(role: &str, extension: &str) -> String {
    let role = role.split_whitespace().collect::<Vec<_>>().join("_");
    let extension = if extension.is_empty() { "pdf" } else { extension };
    format!("JD_{role}.{extension}")
}

/// Routes files into slots. The first file wins a slot; the rest become extras.
pub fn assign_slots(files: &[StoredFile]) -> (ArtifactSlots, Vec<ArtifactEntry>) {
    let mut slots = ArtifactSlots::default();
    let mut extras = Vec::new();

    for file in files.iter().filter(|f| !is_system_file(&f.name)) {
        let l2 = is_l2_artifact(&file.name);
        let slot = match classify(file) {
            ArtifactKind::Resume => &mut slots.resume,
            ArtifactKind::Jd => &mut slots.jd,
            ArtifactKind::Transcript if l2 => &mut slots.l2_transcript,
            ArtifactKind::Transcript => &mut slots.l1_transcript,
            ArtifactKind::Feedback if l2 => &mut slots.l2_feedback,
            ArtifactKind::Feedback => &mut slots.l1_feedback,
            ArtifactKind::Video if l2 => &mut slots.l2_video,
            ArtifactKind::Video => &mut slots.l1_video,
            ArtifactKind::Unknown => {
                extras.push(ArtifactEntry::from_file(file));
                continue;
            }
        };
        if slot.is_none() {
            *slot = Some(ArtifactEntry::from_file(file));
        } else {
            debug!("Slot already filled, keeping '{}' as extra", file.name);
            extras.push(ArtifactEntry::from_file(file));
        }
    }

    (slots, extras)
}

// ────────────────────────────────────────────────────────────────────────────
// Folder normalization
// ────────────────────────────────────────────────────────────────────────────

/// Normalizes one candidate folder and writes its report.
/// A failed JD rename is logged and the original name kept.
pub async fn normalize_candidate_folder(
    store: &dyn FileStore,
    folder: &Folder,
    role: &str,
) -> Result<NormalizationReport, StorageError> {
    let files = store.list_files(&folder.id).await?;
    let candidate_id = existing_candidate_id(store, &files).await;

    let (mut slots, extras) = assign_slots(&files);

    let jd_extension = slots
        .jd
        .as_ref()
        .map(|jd| jd.to_stored_file().extension())
        .unwrap_or_default();
    let jd_canonical_name = canonical_jd_name(role, &jd_extension);

    if let Some(jd) = slots.jd.as_mut() {
        if jd.name != jd_canonical_name {
            match store.rename_file(&jd.file_id, &jd_canonical_name).await {
                Ok(renamed) => {
                    debug!("Renamed JD '{}' -> '{}'", jd.name, renamed.name);
                    jd.file_id = renamed.id;
                    jd.name = renamed.name;
                }
                Err(e) => warn!("Failed to rename JD '{}' in {}: {e}", jd.name, folder.id),
            }
        }
        jd.canonical_name = Some(jd_canonical_name.clone());
    }

    let report = NormalizationReport {
        candidate_id,
        candidate_folder_id: folder.id.clone(),
        candidate_name: folder.name.clone(),
        role_name: role.to_string(),
        normalized_at: Utc::now(),
        jd_canonical_name,
        artifact_version: ARTIFACT_VERSION.to_string(),
        artifacts_summary: slots.summary(),
        artifacts: slots,
        extras,
    };

    let value = serde_json::to_value(&report)
        .map_err(|e| StorageError::Backend(format!("serialize report: {e}")))?;
    store.write_json(&folder.id, REPORT_FILE, &value).await?;

    info!(
        candidate = %folder.name,
        role = %role,
        resume = report.artifacts_summary.resume,
        jd = report.artifacts_summary.jd,
        l1_transcript = report.artifacts_summary.l1_transcript,
        l2_transcript = report.artifacts_summary.l2_transcript,
        "Normalized candidate folder"
    );
    Ok(report)
}

/// Reads the report previously written to a folder, if any.
pub async fn load_report(
    store: &dyn FileStore,
    folder_id: &str,
) -> Result<Option<NormalizationReport>, StorageError> {
    let files = store.list_files(folder_id).await?;
    let Some(file) = find_named(&files, REPORT_FILE) else {
        return Ok(None);
    };
    Ok(read_json(store, file)
        .await?
        .and_then(|v| serde_json::from_value(v).ok()))
}

async fn existing_candidate_id(store: &dyn FileStore, files: &[StoredFile]) -> Uuid {
    let Some(file) = find_named(files, REPORT_FILE) else {
        return Uuid::new_v4();
    };
    match read_json(store, file).await {
        Ok(Some(value)) => value
            .get("candidate_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4),
        _ => Uuid::new_v4(),
    }
}
