//! Structured bot commands (`summary`, `ready-for-l2`, `hires`, `last-run-summary`,
//! `review`, `help`), checked before intent routing.

use tracing::info;

use super::messages;
use super::parsers::{extract_candidate_and_role, normalize_role, split_candidate_role};
use super::ChatBot;
use crate::config::FolderKind;
use crate::errors::AppError;
use crate::pipeline::describe_report;
use crate::pipeline::records::{list_records, name_key, CandidateRecord};
use crate::pipeline::summary::Stage;
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Summary(String),
    ReadyForL2(String),
    Hires(String),
    LastRunSummary,
    Review(String),
    Help,
}

fn payload_after(text: &str, keyword: &str) -> String {
    text.get(keyword.len()..).unwrap_or_default().trim().to_string()
}

/// Recognizes a structured command by its leading keyword.
/// On Riva, `hires` is an alias of `ready-for-l2`.
pub fn parse_command(text: &str, stage: Stage) -> Option<Command> {
    let text = text.trim();
    let lowered = text.to_ascii_lowercase();
    if lowered.starts_with("summary") {
        return Some(Command::Summary(payload_after(text, "summary")));
    }
    if stage == Stage::L1 && lowered.starts_with("ready-for-l2") {
        return Some(Command::ReadyForL2(payload_after(text, "ready-for-l2")));
    }
    if lowered.starts_with("hires") {
        let role = payload_after(text, "hires");
        return Some(match stage {
            Stage::L1 => Command::ReadyForL2(role),
            Stage::L2 => Command::Hires(role),
        });
    }
    if lowered.starts_with("last-run-summary") {
        return Some(Command::LastRunSummary);
    }
    if lowered.starts_with("review ") {
        return Some(Command::Review(payload_after(text, "review")));
    }
    if lowered == "help" || lowered == "commands" {
        return Some(Command::Help);
    }
    None
}

fn usage(stage: Stage, command: &str, args: &str) -> String {
    format!("Usage: @{} {command} {args}", stage.agent())
}

impl ChatBot {
    pub(super) async fn execute(&self, command: Command) -> Result<String, AppError> {
        info!(bot = self.stage.agent(), command = ?command, "Structured command");
        match command {
            Command::Summary(payload) => self.summary_command(&payload).await,
            Command::ReadyForL2(role) => self.ready_for_l2(&role).await,
            Command::Hires(role) => self.hires(&role).await,
            Command::LastRunSummary => Ok(messages::last_run_summary(
                self.stage,
                self.summaries.latest(self.stage).await.as_ref(),
            )),
            Command::Review(payload) => self.manual_review(&payload).await,
            Command::Help => Ok(messages::help(self.stage).to_string()),
        }
    }

    async fn summary_command(&self, payload: &str) -> Result<String, AppError> {
        let Some((candidate, role)) = split_candidate_role(payload) else {
            return Ok(usage(self.stage, "summary", "<Candidate Name> - <Role Name>"));
        };
        Ok(self
            .candidate_summary(&candidate, Some(&role))
            .await?
            .unwrap_or_else(|| format!("No candidate named {candidate} found for role {role}.")))
    }

    fn resolve_role(&self, role_text: &str) -> Option<String> {
        normalize_role(role_text, &self.pipeline.folders.roles)
    }

    async fn records_in(
        &self,
        location: FolderKind,
        role: &str,
    ) -> Result<Vec<CandidateRecord>, AppError> {
        match list_records(self.pipeline.store.as_ref(), &self.pipeline.folders, location, role).await {
            Ok(records) => Ok(records),
            Err(StorageError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// L2-pending candidates whose L1 recommendation was `SEND_TO_L2`.
    async fn ready_for_l2(&self, role_text: &str) -> Result<String, AppError> {
        if role_text.is_empty() {
            return Ok(usage(self.stage, "ready-for-l2", "<Role Name>"));
        }
        let Some(role) = self.resolve_role(role_text) else {
            return Ok(format!("Unknown role '{role_text}'."));
        };
        let lines: Vec<String> = self
            .records_in(FolderKind::L2Pending, &role)
            .await?
            .iter()
            .filter_map(|record| {
                let l1 = record.l1.as_ref().filter(|r| r.recommendation == "SEND_TO_L2")?;
                Some(format!("{} – Score: {:.0}", record.name, l1.overall_score))
            })
            .collect();
        if lines.is_empty() {
            return Ok(format!("No candidates currently ready for L2 in {role}."));
        }
        Ok(messages::bullet_list(&format!("Ready for L2 – {role}"), &lines))
    }

    /// HIRE recommendations in final-selected and L2 pending, deduplicated by name.
    async fn hires(&self, role_text: &str) -> Result<String, AppError> {
        if role_text.is_empty() {
            return Ok(usage(self.stage, "hires", "<Role Name>"));
        }
        let Some(role) = self.resolve_role(role_text) else {
            return Ok(format!("Unknown role '{role_text}'."));
        };
        let mut seen = std::collections::HashSet::new();
        let mut lines = Vec::new();
        for location in [FolderKind::FinalSelected, FolderKind::L2Pending] {
            for record in self.records_in(location, &role).await? {
                let Some(l2) = record.l2.as_ref().filter(|r| r.final_recommendation == "HIRE") else {
                    continue;
                };
                if !seen.insert(name_key(&record.name)) {
                    continue;
                }
                let comparison = if l2.l1_l2_comparison.is_empty() {
                    "N/A"
                } else {
                    l2.l1_l2_comparison.as_str()
                };
                lines.push(format!(
                    "{} – Score: {:.0} (L1 vs L2: {comparison})",
                    record.name, l2.final_score
                ));
            }
        }
        if lines.is_empty() {
            return Ok(format!("No hires recorded for {role}."));
        }
        Ok(messages::bullet_list(&format!("Final Selected – {role}"), &lines))
    }

    /// Re-runs the bot's stage for one candidate.
    async fn manual_review(&self, payload: &str) -> Result<String, AppError> {
        let roles = &self.pipeline.folders.roles;
        let parsed = split_candidate_role(payload)
            .or_else(|| extract_candidate_and_role(payload, roles));
        let Some((candidate, role_text)) = parsed else {
            return Ok(usage(self.stage, "review", "<Candidate Name> - <Role Name>"));
        };
        let role = self.resolve_role(&role_text).unwrap_or(role_text);

        match self.pipeline.review_candidate(self.stage, &candidate, &role).await {
            Ok(report) => Ok(format!(
                "Manual {} review complete for *{}* – *{}*\n{}",
                self.stage.as_str(),
                report.candidate_name,
                report.role,
                describe_report(&report)
            )),
            Err(AppError::Validation(_)) => Ok(format!(
                "Role '{role}' not found.\nAvailable roles: {}",
                roles.join(", ")
            )),
            Err(AppError::NotFound(_)) => Ok(format!(
                "Candidate '{candidate}' not found in {} pending for role '{role}'.\n\
                 Please check the name and try again.",
                self.stage.as_str()
            )),
            Err(e) => Ok(format!(
                "Error triggering manual review: `{}` {e}",
                e.code()
            )),
        }
    }
}
