//! Append-only decision log kept in the `Decisions` tab.
//!
//! Both stages write through the same typed entry; each row fills only its
//! stage's columns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::sheets::{a1, ensure_tab, SheetsApi, SheetsError};

pub const DECISIONS_TAB: &str = "Decisions";

pub const HEADERS: [&str; 16] = [
    "Candidate ID",
    "Candidate Name",
    "Role",
    "L1 Score",
    "L1 Decision",
    "L1 Strengths",
    "L1 Concerns",
    "L1 Reviewed At",
    "L2 Score",
    "L2 Decision",
    "L2 Summary",
    "L2 Reviewed At",
    "Final Status",
    "Final Summary",
    "JD Hash",
    "Resume Hash",
];

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionDetail {
    L1 {
        score: f64,
        decision: String,
        strengths: Vec<String>,
        concerns: Vec<String>,
        jd_hash: String,
        resume_hash: String,
    },
    L2 {
        score: f64,
        decision: String,
        summary: String,
        final_status: String,
        final_summary: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEntry {
    pub candidate_id: String,
    pub candidate_name: String,
    pub role: String,
    pub reviewed_at: DateTime<Utc>,
    pub detail: DecisionDetail,
}

impl DecisionEntry {
    pub fn to_cells(&self) -> Vec<String> {
        let reviewed_at = self.reviewed_at.to_rfc3339();
        let mut cells = vec![
            self.candidate_id.clone(),
            self.candidate_name.clone(),
            self.role.clone(),
        ];
        match &self.detail {
            DecisionDetail::L1 {
                score,
                decision,
                strengths,
                concerns,
                jd_hash,
                resume_hash,
            } => {
                cells.extend([
                    format!("{score:.2}"),
                    decision.clone(),
                    strengths.join("; "),
                    concerns.join("; "),
                    reviewed_at,
                ]);
                cells.extend(std::iter::repeat(String::new()).take(6));
                cells.extend([jd_hash.clone(), resume_hash.clone()]);
            }
            DecisionDetail::L2 {
                score,
                decision,
                summary,
                final_status,
                final_summary,
            } => {
                cells.extend(std::iter::repeat(String::new()).take(5));
                cells.extend([
                    format!("{score:.2}"),
                    decision.clone(),
                    summary.clone(),
                    reviewed_at,
                    final_status.clone(),
                    final_summary.clone(),
                ]);
                cells.extend([String::new(), String::new()]);
            }
        }
        cells
    }
}

/// Hex SHA-256 of a document's text; identifies which inputs a decision saw.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[derive(Clone)]
pub struct DecisionLog {
    api: Arc<dyn SheetsApi>,
    spreadsheet_id: String,
}

impl DecisionLog {
    pub fn new(api: Arc<dyn SheetsApi>, spreadsheet_id: String) -> Self {
        Self {
            api,
            spreadsheet_id,
        }
    }

    pub async fn append(&self, entry: &DecisionEntry) -> Result<(), SheetsError> {
        ensure_tab(self.api.as_ref(), &self.spreadsheet_id, DECISIONS_TAB, &HEADERS).await?;
        self.api
            .append_rows(
                &self.spreadsheet_id,
                &a1(DECISIONS_TAB, "A:P"),
                vec![entry.to_cells()],
            )
            .await?;
        debug!(candidate = %entry.candidate_name, "Logged decision");
        Ok(())
    }
}
