//! Recruiter dashboard: one tab per role, one row per candidate.
//! Rows are keyed by the stable candidate id in column O, so re-runs update in place.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::sheets::{a1, ensure_tab, SheetsApi, SheetsError};

pub const HEADERS: [&str; 15] = [
    "Candidate Name",
    "Current Stage",
    "AI Status",
    "AI Recommendation Detail",
    "Overall Confidence",
    "Key Strengths (Bullets)",
    "Key Concerns (Bullets)",
    "L1 Outcome",
    "L2 Outcome",
    "Next Action",
    "Owner",
    "Feedback Report Link",
    "Folder Link",
    "Last Updated",
    "Candidate Folder ID",
];

const KEY_COLUMN: usize = 14;
const MAX_TITLE_LEN: usize = 90;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardRow {
    pub candidate_name: String,
    pub current_stage: String,
    pub ai_status: String,
    pub recommendation_detail: String,
    pub confidence: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub l1_outcome: String,
    pub l2_outcome: String,
    pub next_action: String,
    pub owner: String,
    pub feedback_link: String,
    pub folder_link: String,
    pub last_updated: DateTime<Utc>,
    pub candidate_key: String,
}

impl DashboardRow {
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.candidate_name.clone(),
            self.current_stage.clone(),
            self.ai_status.clone(),
            self.recommendation_detail.clone(),
            self.confidence.clone(),
            bullets(&self.strengths),
            bullets(&self.concerns),
            self.l1_outcome.clone(),
            self.l2_outcome.clone(),
            self.next_action.clone(),
            self.owner.clone(),
            self.feedback_link.clone(),
            self.folder_link.clone(),
            self.last_updated.format("%d-%b-%Y %H:%M").to_string(),
            self.candidate_key.clone(),
        ]
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" • ")
}

/// Tab title for a role: known roles map to fixed titles, others are title-cased.
pub fn role_tab_title(role: &str) -> String {
    let cleaned: String = role
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.is_empty() {
        return "Unknown Role".to_string();
    }

    match words.join(" ").to_uppercase().as_str() {
        "IT SUPPORT" => return "IT Support".to_string(),
        "IT ADMIN" => return "IT Admin".to_string(),
        "HR SUPPORT" => return "HR Support".to_string(),
        _ => {}
    }

    let title = words
        .iter()
        .map(|w| title_word(w))
        .collect::<Vec<_>>()
        .join(" ");
    title.chars().take(MAX_TITLE_LEN).collect()
}

/// Title-cases a word, keeping short all-caps acronyms (IT, HR, QA) intact.
fn title_word(word: &str) -> String {
    if word.len() <= 3 && word.chars().all(|c| c.is_ascii_uppercase()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Clone)]
pub struct Dashboard {
    api: Arc<dyn SheetsApi>,
    spreadsheet_id: String,
}

impl Dashboard {
    pub fn new(api: Arc<dyn SheetsApi>, spreadsheet_id: String) -> Self {
        Self {
            api,
            spreadsheet_id,
        }
    }

    /// Updates the candidate's row in the role tab, appending when absent.
    pub async fn upsert(&self, role: &str, row: &DashboardRow) -> Result<(), SheetsError> {
        let tab = role_tab_title(role);
        ensure_tab(self.api.as_ref(), &self.spreadsheet_id, &tab, &HEADERS).await?;

        let existing = self
            .api
            .read_range(&self.spreadsheet_id, &a1(&tab, "A2:O"))
            .await?;
        let position = existing
            .iter()
            .position(|r| r.get(KEY_COLUMN).map(String::as_str) == Some(row.candidate_key.as_str()));

        match position {
            Some(index) => {
                let sheet_row = index + 2;
                self.api
                    .write_range(
                        &self.spreadsheet_id,
                        &a1(&tab, &format!("A{sheet_row}:O{sheet_row}")),
                        vec![row.to_cells()],
                    )
                    .await?;
                info!(candidate = %row.candidate_name, tab = %tab, row = sheet_row, "Updated dashboard row");
            }
            None => {
                self.api
                    .append_rows(&self.spreadsheet_id, &a1(&tab, "A:O"), vec![row.to_cells()])
                    .await?;
                info!(candidate = %row.candidate_name, tab = %tab, "Appended dashboard row");
            }
        }
        Ok(())
    }
}
