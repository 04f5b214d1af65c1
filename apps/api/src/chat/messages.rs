//! Reply texts: canned bot messages and formatting of pipeline data for chat.

use crate::pipeline::records::{location_label, CandidateRecord};
use crate::pipeline::summary::{BatchSummary, CandidateReport, OutcomeKind, Stage};

pub const WORKING_PLACEHOLDER: &str =
    "Processing your request… fetching the latest evaluation data from the system.";
pub const PIPELINE_ERROR: &str =
    "I hit a snag while processing that request. Please try again in a moment.";
pub const SLASH_ACK: &str = "Got it, I'm on it. I'll reply here once I've processed your request.";
pub const TEST_MESSAGE: &str = "Slack bot test successful! – Recruiter Bot";

const ERROR_DIGEST_LIMIT: usize = 3;
const LIST_LIMIT: usize = 10;

pub fn greeting(stage: Stage) -> &'static str {
    match stage {
        Stage::L1 => "Hello! I'm Riva, your L1 recruitment assistant. I can evaluate candidates, \
            summarize L1 results, and share quick batch insights. What would you like to do?",
        Stage::L2 => "Hello! I'm Arjun, your L2 hiring evaluator. I can run deep dives, report \
            final selections, and share L2 outcomes. What would you like me to analyze?",
    }
}

pub fn capabilities(stage: Stage) -> &'static str {
    match stage {
        Stage::L1 => "I'm Riva – your L1 recruitment assistant. I can:\n\
            1) Share the L1 status of a candidate for a role\n\
            2) List candidates ready for L2\n\
            3) Run the L1 batch or report on the last run\n\
            4) Re-review a single candidate\n\
            Try: \"status of Priya Shah for IT Support\" or \"ready-for-l2 IT Support\".",
        Stage::L2 => "I'm Arjun – your L2 evaluation assistant. I can:\n\
            1) Share the L2 outcome of a candidate for a role\n\
            2) List final selections for a role\n\
            3) Run the L2 batch or report on the last run\n\
            4) Re-review a single candidate\n\
            Try: \"summary Priya Shah - IT Support\" or \"hires IT Admin\".",
    }
}

pub fn unsure(stage: Stage) -> &'static str {
    match stage {
        Stage::L1 => "I'm not sure what you need yet. Try one of these formats:\n\
            • \"Evaluate Priya Shah for the IT Support role\"\n\
            • \"summary Priya Shah - IT Support\"\n\
            • \"What did you run for L1 today?\"",
        Stage::L2 => "I'm not sure what you need yet. Try one of these:\n\
            • \"Deep dive on Priya Shah for IT Support\"\n\
            • \"hires IT Support\"\n\
            • \"What were the latest L2 outcomes?\"",
    }
}

pub fn small_talk(stage: Stage) -> &'static str {
    match stage {
        Stage::L1 => "Thanks for the note! Whenever you need me, try something like \
            \"Evaluate Jane Doe for the HR Support role\".",
        Stage::L2 => "Thanks! When you're ready, ask me about L2 candidates, for example \
            \"Deep dive on Aisha for IT Admin\".",
    }
}

pub fn help(stage: Stage) -> &'static str {
    match stage {
        Stage::L1 => "Supported commands:\n\
            • @Riva summary <Candidate> - <Role>\n\
            • @Riva ready-for-l2 <Role> (or `hires <Role>` alias)\n\
            • @Riva last-run-summary\n\
            • @Riva review <Candidate> - <Role> (trigger manual L1 review)\n\
            \nOr just ask me in natural language!",
        Stage::L2 => "Supported commands:\n\
            • @Arjun summary <Candidate> - <Role>\n\
            • @Arjun hires <Role>\n\
            • @Arjun last-run-summary\n\
            • @Arjun review <Candidate> - <Role> (trigger manual L2 review)",
    }
}

pub fn no_work_match(stage: Stage) -> &'static str {
    match stage {
        Stage::L1 => "I couldn't find matching candidate or batch data for that request.",
        Stage::L2 => "I couldn't find matching L2 data for that request.",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Candidate answers
// ────────────────────────────────────────────────────────────────────────────

fn truncate(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

fn joined(items: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    (!cleaned.is_empty()).then(|| cleaned.join(", "))
}

fn l1_label(code: &str) -> Option<&'static str> {
    Some(match code.to_uppercase().as_str() {
        "SEND_TO_L2" | "MOVE" => "Move to L2",
        "REJECT_AT_L1" | "REJECT" => "Reject at L1",
        "HOLD" => "Hold (Manual Review)",
        "ON_HOLD_MISSING_L1_TRANSCRIPT" => "Hold (Missing L1 transcript)",
        "DATA_INCOMPLETE" => "Hold (Data Incomplete)",
        _ => return None,
    })
}

fn l1_next_step(code: &str) -> &'static str {
    match code.to_uppercase().as_str() {
        "ON_HOLD_MISSING_L1_TRANSCRIPT" => "On hold – missing L1 transcript",
        "DATA_INCOMPLETE" => "On hold – data incomplete",
        "HOLD" => "On hold – recruiter review",
        "SEND_TO_L2" => "Ready for L2",
        "REJECT_AT_L1" => "Rejected at L1",
        _ => "Awaiting recruiter action",
    }
}

fn l2_label(code: &str) -> String {
    match code.to_uppercase().as_str() {
        "HIRE" => "Move to Final Selected".to_string(),
        "REJECT" => "Rejected at L2".to_string(),
        "HOLD" => "Hold (Exec review)".to_string(),
        "ON_HOLD_MISSING_L2_TRANSCRIPT" => "Hold (Missing L2 transcript)".to_string(),
        "DATA_INCOMPLETE_L2" => "Hold (Data incomplete)".to_string(),
        _ => code.to_string(),
    }
}

fn l2_next_step(code: &str) -> &'static str {
    match code.to_uppercase().as_str() {
        "HIRE" => "Move to Final Selected",
        "REJECT" => "Reject",
        "HOLD" => "Await recruiter decision",
        "ON_HOLD_MISSING_L2_TRANSCRIPT" => "On hold – missing L2 transcript",
        "DATA_INCOMPLETE_L2" => "On hold – data incomplete",
        _ => "Awaiting recruiter action",
    }
}

/// L1 view of a candidate: decision, fit score, risks and next step.
pub fn l1_answer(record: &CandidateRecord) -> String {
    let status = record.l1_status.as_ref().map(|s| s.status.as_str());
    let result = record.l1.as_ref();
    let codes = [
        status,
        result.map(|r| r.recommendation.as_str()),
        result.map(|r| r.pipeline_recommendation.as_str()),
    ];
    let decision = codes
        .iter()
        .flatten()
        .find_map(|code| l1_label(code))
        .map(str::to_string)
        .or_else(|| status.filter(|s| !s.is_empty()).map(str::to_string))
        .unwrap_or_else(|| "Decision pending".to_string());
    let next_step = status
        .or(result.map(|r| r.recommendation.as_str()))
        .map(l1_next_step)
        .unwrap_or_else(|| l1_next_step(""));

    let mut lines = vec![
        format!("{} – {}", record.name, record.role),
        format!("L1 Decision: {decision}"),
    ];
    if let Some(result) = result {
        lines.push(format!("Fit score: {:.0}", result.overall_score));
        if let Some(risks) = joined(&result.risks) {
            lines.push(format!("Risk flags: {risks}"));
        }
        if let Some(strengths) = joined(&result.strengths) {
            lines.push(format!("Strengths: {strengths}"));
        }
        if !result.rationale.trim().is_empty() {
            lines.push(format!("Summary: {}", truncate(&result.rationale, 400)));
        }
    }
    lines.push(format!("Current folder: {}", location_label(record.location)));
    lines.push(format!("Next step: {next_step}"));
    lines.join("\n")
}

/// L2 view of a candidate. `None` when the candidate has no L2 result yet.
pub fn l2_answer(record: &CandidateRecord) -> Option<String> {
    let result = record.l2.as_ref()?;
    let status = record
        .l2_status
        .as_ref()
        .map(|s| s.status.as_str())
        .unwrap_or(result.final_recommendation.as_str());

    let mut lines = vec![
        format!("{} – {}", record.name, record.role),
        format!("L2 Decision: {}", l2_label(status)),
    ];
    if !result.l2_summary.trim().is_empty() {
        lines.push(format!("L2 Summary: {}", truncate(&result.l2_summary, 280)));
    }
    let comparison = if result.l1_l2_comparison.is_empty() {
        "N/A"
    } else {
        result.l1_l2_comparison.as_str()
    };
    lines.push(format!("L1 vs L2: {comparison}"));
    if let Some(risks) = joined(&result.risk_flags) {
        lines.push(format!("Risk flags: {risks}"));
    }
    lines.push(format!("Current folder: {}", location_label(record.location)));
    lines.push(format!("Next step: {}", l2_next_step(status)));
    Some(lines.join("\n"))
}

/// Bulleted list headed by `title`, capped at ten entries.
pub fn bullet_list(title: &str, lines: &[String]) -> String {
    let body: Vec<String> = lines.iter().take(LIST_LIMIT).map(|l| format!("• {l}")).collect();
    format!("{title}:\n{}", body.join("\n"))
}

// ────────────────────────────────────────────────────────────────────────────
// Batch summaries
// ────────────────────────────────────────────────────────────────────────────

/// Up to three failed candidates, then a count of the rest.
pub fn error_digest(summary: &BatchSummary) -> Option<String> {
    if summary.error_details.is_empty() {
        return None;
    }
    let mut lines = Vec::new();
    for error in summary.error_details.iter().take(ERROR_DIGEST_LIMIT) {
        let candidate = if error.candidate_name.is_empty() {
            "Unknown candidate"
        } else {
            &error.candidate_name
        };
        let role = if error.role.is_empty() { "Unknown role" } else { &error.role };
        let mut header = format!("- {candidate} – {role}");
        if !error.folder_link.is_empty() {
            header.push_str(&format!(" (<{}|folder>)", error.folder_link));
        }
        lines.push(header);
        lines.push(format!("  Error: `{}`", error.error_code));
        lines.push(format!("  {}", error.error_message));
    }
    if summary.error_details.len() > ERROR_DIGEST_LIMIT {
        let remaining = summary.error_details.len() - ERROR_DIGEST_LIMIT;
        lines.push(format!("- …and {remaining} more errors. See detailed report."));
    }
    Some(lines.join("\n"))
}

fn with_digest(mut text: String, summary: &BatchSummary) -> String {
    if let Some(digest) = error_digest(summary) {
        text.push_str("\n\nErrors:\n");
        text.push_str(&digest);
    }
    text
}

/// Reply to `last-run-summary` and batch-status questions.
pub fn last_run_summary(stage: Stage, summary: Option<&BatchSummary>) -> String {
    let Some(s) = summary else {
        return format!(
            "No {} {} runs have completed yet.",
            stage.agent(),
            stage.as_str()
        );
    };
    let text = match stage {
        Stage::L1 => format!(
            "Last Riva L1 run:\n\
             Candidates seen: {}\n\
             Evaluated: {}\n\
             Sent to L2: {}\n\
             Rejected at L1: {}\n\
             Hold: {} (manual-review: {}, backup: {}, missing transcript: {}, data incomplete: {})\n\
             Errors: {}",
            s.total_seen,
            s.evaluated,
            s.advanced,
            s.rejected,
            s.held,
            s.hold_manual_review,
            s.hold_backup,
            s.hold_missing_transcript,
            s.hold_data_incomplete,
            s.errors
        ),
        Stage::L2 => format!(
            "Last Arjun L2 run:\n\
             Candidates seen: {}\n\
             Evaluated: {}\n\
             Hires: {}\n\
             Rejects: {}\n\
             On hold (missing L2 transcript): {}\n\
             Data incomplete: {}\n\
             Hold: {} (manual-review: {}, backup: {})\n\
             Errors: {}",
            s.total_seen,
            s.evaluated,
            s.advanced,
            s.rejected,
            s.hold_missing_transcript,
            s.hold_data_incomplete,
            s.held,
            s.hold_manual_review,
            s.hold_backup,
            s.errors
        ),
    };
    with_digest(text, s)
}

fn advanced_label(stage: Stage) -> (&'static str, &'static str) {
    match stage {
        Stage::L1 => ("Sent to L2", "Rejected at L1"),
        Stage::L2 => ("Hires", "Rejects"),
    }
}

/// Reply after a chat-triggered batch run.
pub fn batch_completion(summary: &BatchSummary) -> String {
    let (advanced, rejected) = advanced_label(summary.stage);
    let text = format!(
        "{} {} batch complete:\n\
         Candidates seen: {}\n\
         Evaluated: {}\n\
         {advanced}: {}\n\
         {rejected}: {}\n\
         Hold decisions: {}\n\
         Errors: {}",
        summary.stage.agent(),
        summary.stage.as_str(),
        summary.total_seen,
        summary.evaluated,
        summary.advanced,
        summary.rejected,
        summary.held,
        summary.errors
    );
    with_digest(text, summary)
}

fn hold_reason_text(report: &CandidateReport) -> Option<String> {
    let base = report.hold_reason().map(|r| r.describe());
    let detail = Some(report.detail.trim()).filter(|d| !d.is_empty());
    match (base, detail) {
        (Some(base), Some(detail)) if detail.to_lowercase().contains(&base.to_lowercase()) => {
            Some(detail.to_string())
        }
        (Some(base), Some(detail)) => Some(format!("{base} ({detail})")),
        (None, Some(detail)) => Some(detail.to_string()),
        (Some(base), None) => Some(base.to_string()),
        (None, None) => None,
    }
}

fn candidate_section(emoji: &str, title: &str, reports: &[&CandidateReport], show_reason: bool) -> String {
    let mut lines = vec![format!("{emoji} *{title}* (`{}`)", reports.len())];
    for report in reports {
        let mut bullet = format!("• *{}* – {}", report.candidate_name, report.role);
        if !report.folder_link.is_empty() {
            bullet.push_str(&format!(" <{}|folder>", report.folder_link));
        }
        lines.push(bullet);
        if show_reason {
            if let Some(reason) = hold_reason_text(report) {
                lines.push(format!("  _Reason: {reason}_"));
            }
        }
    }
    lines.join("\n")
}

/// Message posted to the stage's default channel after every batch run.
pub fn batch_notification(summary: &BatchSummary) -> String {
    let (advanced_title, _) = advanced_label(summary.stage);
    let mut sections = vec![format!(
        "{} {} Batch Complete: {} evaluated, {} {}, {} errors",
        summary.stage.agent(),
        summary.stage.as_str(),
        summary.evaluated,
        summary.advanced,
        advanced_title.to_lowercase(),
        summary.errors
    )];

    let groups = [
        (OutcomeKind::Advanced, ":large_green_circle:", advanced_title, false),
        (OutcomeKind::Held, ":large_yellow_circle:", "Hold", true),
        (OutcomeKind::Rejected, ":red_circle:", "Rejected", false),
    ];
    for (outcome, emoji, title, show_reason) in groups {
        let reports: Vec<&CandidateReport> = summary.reports_with(outcome).collect();
        if !reports.is_empty() {
            sections.push(candidate_section(emoji, title, &reports, show_reason));
        }
    }
    if let Some(digest) = error_digest(summary) {
        sections.push(format!(":warning: *Errors*\n{digest}"));
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FolderKind;
    use crate::pipeline::records::{L1ResultRecord, L2ResultRecord, StatusRecord};
    use crate::pipeline::summary::{CandidateError, HoldType};
    use crate::storage::Folder;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(location: FolderKind) -> CandidateRecord {
        CandidateRecord {
            name: "Priya Shah".into(),
            role: "IT Support".into(),
            folder: Folder {
                id: "L2 Pending Review/IT Support/Priya Shah".into(),
                name: "Priya Shah".into(),
            },
            location,
            l1: None,
            l2: None,
            l1_status: None,
            l2_status: None,
        }
    }

    fn error(name: &str) -> CandidateError {
        CandidateError {
            candidate_name: name.into(),
            role: "IT Support".into(),
            folder_id: format!("L1 Pending Review/IT Support/{name}"),
            folder_link: String::new(),
            error_code: "LLM_ERROR".into(),
            error_message: "LLM error: timeout".into(),
        }
    }

    #[test]
    fn test_l1_answer_prefers_status_label() {
        let mut rec = record(FolderKind::L2Pending);
        rec.l1 = Some(L1ResultRecord {
            overall_score: 81.0,
            recommendation: "SEND_TO_L2".into(),
            pipeline_recommendation: "MOVE".into(),
            risks: vec!["Short tenure".into()],
            ..Default::default()
        });
        rec.l1_status = Some(StatusRecord {
            status: "SEND_TO_L2".into(),
            detail: "Score 0.81 above advance threshold".into(),
            updated_at: Utc::now(),
            correlation_id: Uuid::new_v4(),
        });
        let text = l1_answer(&rec);
        assert!(text.starts_with("Priya Shah – IT Support\nL1 Decision: Move to L2"));
        assert!(text.contains("Fit score: 81"));
        assert!(text.contains("Risk flags: Short tenure"));
        assert!(text.ends_with("Next step: Ready for L2"));
    }

    #[test]
    fn test_l1_answer_without_result_is_pending() {
        let text = l1_answer(&record(FolderKind::L1Pending));
        assert!(text.contains("L1 Decision: Decision pending"));
        assert!(text.contains("Next step: Awaiting recruiter action"));
    }

    #[test]
    fn test_l2_answer_requires_result() {
        let mut rec = record(FolderKind::FinalSelected);
        assert!(l2_answer(&rec).is_none());
        rec.l2 = Some(L2ResultRecord {
            final_recommendation: "HIRE".into(),
            l1_l2_comparison: "IMPROVED".into(),
            ..Default::default()
        });
        let text = l2_answer(&rec).unwrap();
        assert!(text.contains("L2 Decision: Move to Final Selected"));
        assert!(text.contains("L1 vs L2: IMPROVED"));
        assert!(text.contains("Current folder: final selected"));
    }

    #[test]
    fn test_error_digest_caps_at_three() {
        let mut summary = BatchSummary::new(Stage::L1, Uuid::new_v4());
        for name in ["A", "B", "C", "D", "E"] {
            summary.record_error(error(name));
        }
        let digest = error_digest(&summary).unwrap();
        assert!(digest.contains("- A – IT Support"));
        assert!(digest.contains("- C – IT Support"));
        assert!(!digest.contains("- D – IT Support"));
        assert!(digest.ends_with("- …and 2 more errors. See detailed report."));
    }

    #[test]
    fn test_last_run_summary_texts() {
        assert_eq!(
            last_run_summary(Stage::L2, None),
            "No Arjun L2 runs have completed yet."
        );
        let mut summary = BatchSummary::new(Stage::L1, Uuid::new_v4());
        summary.total_seen = 4;
        summary.record_error(error("A"));
        let text = last_run_summary(Stage::L1, Some(&summary));
        assert!(text.starts_with("Last Riva L1 run:\nCandidates seen: 4"));
        assert!(text.contains("\n\nErrors:\n- A – IT Support"));
    }

    #[test]
    fn test_batch_notification_groups_outcomes() {
        let mut summary = BatchSummary::new(Stage::L1, Uuid::new_v4());
        summary.record(CandidateReport {
            candidate_name: "Meera Iyer".into(),
            role: "IT Support".into(),
            folder_id: "f".into(),
            folder_link: "memory://f/".into(),
            outcome: OutcomeKind::Held,
            status: "HOLD".into(),
            detail: "Awaiting recruiter review".into(),
            hold_type: Some(HoldType::CapacityBackup),
            score: Some(0.75),
            l1_vs_l2: None,
            warnings: Vec::new(),
        });
        let text = batch_notification(&summary);
        assert!(text.starts_with("Riva L1 Batch Complete: 1 evaluated, 0 sent to l2, 0 errors"));
        assert!(text.contains(":large_yellow_circle: *Hold* (`1`)"));
        assert!(text.contains("_Reason: backup pool for L2 capacity (Awaiting recruiter review)_"));
        assert!(!text.contains("*Rejected*"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
