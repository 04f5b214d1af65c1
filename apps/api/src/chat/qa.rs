//! Routing of work-style questions: batch runs, batch status and candidate status.

use std::sync::OnceLock;

use regex::Regex;

use super::parsers::{
    extract_candidate_and_role, split_candidate_role, strip_word_prefix, COMMAND_PREFIXES,
};
use crate::pipeline::summary::Stage;

pub const NO_COMPLETED_RUNS: &str = "No completed runs found for this pipeline.";

/// Trailing words dropped from a parsed candidate name ("how is Priya doing").
const TRAILING_NOISE: &[&str] = &[
    "doing", "going", "looking", "progress", "coming", "performing", "perform", "faring",
];

#[derive(Debug, Clone, PartialEq)]
pub enum WorkQuery {
    BatchRun,
    BatchStatus,
    Candidate {
        candidate: String,
        role: Option<String>,
    },
}

fn status_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:status|summary|outcome|result|decision|evaluate|review)\s+(?:(?:of|for|on)\s+)?(?P<candidate>[A-Za-z][A-Za-z\s]+?)\s*(?:for|-)\s*(?P<role>[A-Za-z0-9][A-Za-z0-9\s]+)",
        )
        .expect("valid regex")
    })
}

fn for_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?P<candidate>[A-Za-z][A-Za-z\s]+?)\s+for\s+(?P<role>[A-Za-z0-9][A-Za-z0-9\s]+)")
            .expect("valid regex")
    })
}

fn candidate_only_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:status of|status for|status on|how is|where is|update on|status)\s+(?P<candidate>[A-Za-z][A-Za-z\s]+)",
        )
        .expect("valid regex")
    })
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

/// Whole-word prefix match, so "run" matches "runs" but not "Arun".
fn has_word(text: &str, stems: &[&str]) -> bool {
    words(text).any(|w| stems.iter().any(|s| w.starts_with(s)))
}

fn looks_like_batch_run(normalized: &str, stage: Stage) -> bool {
    let wants_run = has_word(normalized, &["run", "start", "trigger", "kickoff"])
        || normalized.contains("kick off");
    if wants_run && has_word(normalized, &["batch", "pipeline"]) {
        return true;
    }
    normalized.contains(&format!("run {}", stage.as_str().to_lowercase()))
}

fn looks_like_batch_status(normalized: &str) -> bool {
    has_word(
        normalized,
        &["latest", "last", "recent", "outcome", "results", "summary", "metrics"],
    ) && has_word(normalized, &["batch", "pipeline", "run"])
}

fn strip_trailing_noise(candidate: &str) -> String {
    let mut tokens: Vec<&str> = candidate.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        let cleaned = last
            .trim_matches(|c| matches!(c, '?' | '.' | '!' | ','))
            .to_lowercase();
        if !TRAILING_NOISE.contains(&cleaned.as_str()) {
            break;
        }
        tokens.pop();
    }
    tokens.join(" ")
}

fn strip_command_prefix(text: &str) -> &str {
    COMMAND_PREFIXES
        .iter()
        .find_map(|p| strip_word_prefix(text, p))
        .unwrap_or(text)
}

fn candidate_and_role(text: &str, roles: &[String]) -> Option<(String, Option<String>)> {
    if let Some((candidate, role)) = extract_candidate_and_role(text, roles) {
        return Some((candidate, Some(role)));
    }

    // Dash notation with a role that is not configured, kept so the reply can name it.
    if let Some((head, role)) = split_candidate_role(text) {
        let candidate = strip_trailing_noise(strip_command_prefix(&head));
        let role = role.trim_end_matches(|c| matches!(c, '?' | '.' | '!'));
        if !candidate.is_empty() && !role.is_empty() {
            return Some((candidate, Some(role.to_string())));
        }
    }

    for pattern in [status_pattern(), for_pattern()] {
        if let Some(caps) = pattern.captures(text) {
            let candidate = strip_trailing_noise(caps["candidate"].trim());
            let role = caps["role"].trim();
            if !candidate.is_empty() && !role.is_empty() {
                return Some((candidate, Some(role.to_string())));
            }
        }
    }

    let caps = candidate_only_pattern().captures(text)?;
    let candidate = strip_trailing_noise(caps["candidate"].trim());
    (!candidate.is_empty()).then_some((candidate, None))
}

/// Interprets a workflow message. `None` when it names neither a batch nor a candidate.
pub fn parse_work_query(text: &str, stage: Stage, roles: &[String]) -> Option<WorkQuery> {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if looks_like_batch_run(&normalized, stage) {
        return Some(WorkQuery::BatchRun);
    }
    if looks_like_batch_status(&normalized) {
        return Some(WorkQuery::BatchStatus);
    }
    let (candidate, role) = candidate_and_role(text.trim(), roles)?;
    Some(WorkQuery::Candidate { candidate, role })
}

pub fn not_found_text(candidate: &str, role: Option<&str>) -> String {
    match role {
        Some(role) => format!("No record found for {candidate} – {role}."),
        None => format!("No record found for {candidate}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Vec<String> {
        vec!["IT Support".into(), "IT Admin".into(), "HR Support".into()]
    }

    fn parse(text: &str, stage: Stage) -> Option<WorkQuery> {
        parse_work_query(text, stage, &roles())
    }

    fn candidate(name: &str, role: Option<&str>) -> Option<WorkQuery> {
        Some(WorkQuery::Candidate {
            candidate: name.into(),
            role: role.map(str::to_string),
        })
    }

    #[test]
    fn test_batch_run_detection() {
        assert_eq!(parse("please run the batch now", Stage::L1), Some(WorkQuery::BatchRun));
        assert_eq!(parse("kick off the pipeline", Stage::L2), Some(WorkQuery::BatchRun));
        assert_eq!(parse("run l2", Stage::L2), Some(WorkQuery::BatchRun));
        // "run l2" only triggers Arjun
        assert_ne!(parse("run l2", Stage::L1), Some(WorkQuery::BatchRun));
    }

    #[test]
    fn test_batch_status_detection() {
        assert_eq!(parse("latest batch results", Stage::L1), Some(WorkQuery::BatchStatus));
        assert_eq!(parse("summary of the last run", Stage::L2), Some(WorkQuery::BatchStatus));
    }

    #[test]
    fn test_name_containing_run_is_not_a_batch() {
        assert_eq!(
            parse("summary Arun Rao - IT Admin", Stage::L1),
            candidate("Arun Rao", Some("IT Admin"))
        );
    }

    #[test]
    fn test_candidate_without_role() {
        assert_eq!(parse("Status of Priya Shah", Stage::L1), candidate("Priya Shah", None));
        assert_eq!(parse("How is Rahul Menon doing?", Stage::L2), candidate("Rahul Menon", None));
    }

    #[test]
    fn test_unconfigured_role_is_kept() {
        assert_eq!(
            parse("status of Priya Shah for Product Manager", Stage::L1),
            candidate("Priya Shah", Some("Product Manager"))
        );
        assert_eq!(
            parse("Priya Shah – Finance", Stage::L2),
            candidate("Priya Shah", Some("Finance"))
        );
    }

    #[test]
    fn test_status_of_phrase_drops_preposition() {
        assert_eq!(
            candidate_and_role("review of Priya Shah for Product Manager", &roles()),
            Some(("Priya Shah".into(), Some("Product Manager".into())))
        );
    }

    #[test]
    fn test_nothing_to_route() {
        assert_eq!(parse("who is ready", Stage::L2), None);
        assert_eq!(parse("   ", Stage::L1), None);
    }

    #[test]
    fn test_strip_trailing_noise() {
        assert_eq!(strip_trailing_noise("Priya Shah doing going?"), "Priya Shah");
        assert_eq!(strip_trailing_noise("doing"), "");
    }

    #[test]
    fn test_not_found_text() {
        assert_eq!(not_found_text("Priya", None), "No record found for Priya.");
        assert_eq!(
            not_found_text("Priya", Some("IT Support")),
            "No record found for Priya – IT Support."
        );
    }
}
