//! Records the pipelines leave in each candidate folder, and the lookups the
//! chat commands use to read them back.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::{FolderKind, FolderLayout};
use crate::decision::l2::L2Outcome;
use crate::normalizer::{L1_RESULT_FILE, L1_STATUS_FILE, L2_RESULT_FILE, L2_STATUS_FILE};
use crate::pipeline::summary::HoldType;
use crate::storage::{find_named, read_json, FileStore, Folder, StorageError, StoredFile};

/// Every location a candidate folder can sit in, in pipeline order.
pub const ALL_LOCATIONS: [FolderKind; 5] = [
    FolderKind::L1Pending,
    FolderKind::L2Pending,
    FolderKind::FinalSelected,
    FolderKind::L1Rejected,
    FolderKind::L2Rejected,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: String,
    pub detail: String,
    pub updated_at: DateTime<Utc>,
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct L1ResultRecord {
    pub candidate_id: Option<Uuid>,
    /// 0-100.
    pub overall_score: f64,
    pub confidence: f64,
    pub match_summary: String,
    pub strengths: Vec<String>,
    pub risks: Vec<String>,
    /// `SEND_TO_L2`, `REJECT_AT_L1` or `HOLD`.
    pub recommendation: String,
    /// `MOVE`, `REJECT` or `HOLD`.
    pub pipeline_recommendation: String,
    pub hold_type: Option<HoldType>,
    pub rationale: String,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl L1ResultRecord {
    /// Dashboard wording of the L1 outcome.
    pub fn outcome_label(&self) -> &'static str {
        match self.pipeline_recommendation.as_str() {
            "MOVE" => "Move to L2",
            "REJECT" => "Reject",
            _ => "Hold",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct L2ResultRecord {
    pub candidate_id: Option<Uuid>,
    /// 0-100.
    pub final_score: f64,
    pub confidence: f64,
    /// `HIRE`, `REJECT` or `HOLD`.
    pub final_recommendation: String,
    pub outcome: Option<L2Outcome>,
    pub hold_type: Option<HoldType>,
    pub l2_summary: String,
    /// `IMPROVED`, `REGRESSED`, `CONSISTENT` or `N/A`.
    pub l1_l2_comparison: String,
    pub strengths: Vec<String>,
    pub risk_flags: Vec<String>,
    pub rationale: String,
    pub evaluated_at: Option<DateTime<Utc>>,
}

/// Everything the pipelines know about one candidate folder.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub name: String,
    pub role: String,
    pub folder: Folder,
    pub location: FolderKind,
    pub l1: Option<L1ResultRecord>,
    pub l2: Option<L2ResultRecord>,
    pub l1_status: Option<StatusRecord>,
    pub l2_status: Option<StatusRecord>,
}

pub fn location_label(kind: FolderKind) -> &'static str {
    match kind {
        FolderKind::L1Pending => "L1 pending review",
        FolderKind::L2Pending => "L2 pending review",
        FolderKind::FinalSelected => "final selected",
        FolderKind::L1Rejected => "rejected at L1",
        FolderKind::L2Rejected => "rejected at L2",
    }
}

async fn read_typed<T: DeserializeOwned>(
    store: &dyn FileStore,
    files: &[StoredFile],
    name: &str,
) -> Result<Option<T>, StorageError> {
    let Some(file) = find_named(files, name) else {
        return Ok(None);
    };
    let Some(value) = read_json(store, file).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!("Ignoring unreadable {} in {}: {e}", name, file.id);
            Ok(None)
        }
    }
}

pub async fn read_l1_result(
    store: &dyn FileStore,
    folder_id: &str,
) -> Result<Option<L1ResultRecord>, StorageError> {
    let files = store.list_files(folder_id).await?;
    read_typed(store, &files, L1_RESULT_FILE).await
}

pub async fn load_record(
    store: &dyn FileStore,
    folder: &Folder,
    role: &str,
    location: FolderKind,
) -> Result<CandidateRecord, StorageError> {
    let files = store.list_files(&folder.id).await?;
    Ok(CandidateRecord {
        name: folder.name.clone(),
        role: role.to_string(),
        folder: folder.clone(),
        location,
        l1: read_typed(store, &files, L1_RESULT_FILE).await?,
        l2: read_typed(store, &files, L2_RESULT_FILE).await?,
        l1_status: read_typed(store, &files, L1_STATUS_FILE).await?,
        l2_status: read_typed(store, &files, L2_STATUS_FILE).await?,
    })
}

/// Lowercased with `_`/`-` flattened, for forgiving name comparison.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
        .replace(['_', '-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Records for every candidate in one location and role.
pub async fn list_records(
    store: &dyn FileStore,
    layout: &FolderLayout,
    location: FolderKind,
    role: &str,
) -> Result<Vec<CandidateRecord>, StorageError> {
    let folders = store
        .list_folders(&layout.role_folder(location, role))
        .await?;
    let mut records = Vec::with_capacity(folders.len());
    for folder in &folders {
        records.push(load_record(store, folder, role, location).await?);
    }
    Ok(records)
}

/// Searches every location for folders whose name matches `query`.
/// Exact name matches win over partial ones.
pub async fn find_candidates(
    store: &dyn FileStore,
    layout: &FolderLayout,
    query: &str,
    role: Option<&str>,
) -> Result<Vec<CandidateRecord>, StorageError> {
    let wanted = name_key(query);
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let roles: Vec<&str> = match role {
        Some(r) => vec![r],
        None => layout.roles.iter().map(String::as_str).collect(),
    };

    let mut exact = Vec::new();
    let mut partial = Vec::new();
    for role in roles {
        for location in ALL_LOCATIONS {
            let folders = match store.list_folders(&layout.role_folder(location, role)).await {
                Ok(folders) => folders,
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            for folder in folders {
                let key = name_key(&folder.name);
                if key == wanted {
                    exact.push(load_record(store, &folder, role, location).await?);
                } else if key.contains(&wanted) {
                    partial.push(load_record(store, &folder, role, location).await?);
                }
            }
        }
    }
    Ok(if exact.is_empty() { partial } else { exact })
}
