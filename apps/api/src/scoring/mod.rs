//! Candidate scoring: the model-backed reviewer for each stage.
//!
//! `AppState` holds an `Arc<dyn CandidateScorer>`; tests swap in scripted scorers.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::{Captures, Regex};

use crate::decision::l1::L1Policy;
use crate::errors::AppError;
use crate::llm_client::{LlmClient, REVIEW_MAX_TOKENS};

pub mod models;
pub mod prompts;

use models::{ArjunL2Result, RivaL1Result};
use prompts::{L1_PROMPT_TEMPLATE, L1_SYSTEM, L2_PROMPT_TEMPLATE, L2_SYSTEM, MEMORY_CONTEXT_HEADING};

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct L1Input {
    pub candidate_name: String,
    pub role: String,
    pub jd: String,
    pub resume: String,
    pub transcript: String,
    pub feedback: Option<String>,
    pub memory_context: Option<String>,
    /// Thresholds quoted in the prompt's scoring bands.
    pub policy: L1Policy,
}

#[derive(Debug, Clone, Default)]
pub struct L2Input {
    pub candidate_name: String,
    pub role: String,
    pub jd: String,
    pub resume: String,
    pub transcript: String,
    pub l1_summary: Option<String>,
    pub memory_context: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CandidateScorer: Send + Sync {
    async fn score_l1(&self, input: &L1Input) -> Result<RivaL1Result, AppError>;

    async fn score_l2(&self, input: &L2Input) -> Result<ArjunL2Result, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmCandidateScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmCandidateScorer(pub LlmClient);

#[async_trait]
impl CandidateScorer for LlmCandidateScorer {
    async fn score_l1(&self, input: &L1Input) -> Result<RivaL1Result, AppError> {
        let prompt = build_l1_prompt(input);
        Ok(self.0.call_json::<RivaL1Result>(&prompt, L1_SYSTEM, REVIEW_MAX_TOKENS).await?)
    }

    async fn score_l2(&self, input: &L2Input) -> Result<ArjunL2Result, AppError> {
        let prompt = build_l2_prompt(input);
        Ok(self.0.call_json::<ArjunL2Result>(&prompt, L2_SYSTEM, REVIEW_MAX_TOKENS).await?)
    }
}

pub fn build_l1_prompt(input: &L1Input) -> String {
    let move_min = points(input.policy.advance_threshold);
    let reject_max = points(input.policy.reject_threshold);
    let memory = memory_section(input.memory_context.as_deref());
    fill_template(
        L1_PROMPT_TEMPLATE,
        &[
            ("candidate_name", &input.candidate_name),
            ("role", &input.role),
            ("feedback", input.feedback.as_deref().unwrap_or("Not provided")),
            ("memory_context", &memory),
            ("jd", &input.jd),
            ("resume", &input.resume),
            ("transcript", &input.transcript),
            ("move_min", &move_min),
            ("reject_max", &reject_max),
        ],
    )
}

pub fn build_l2_prompt(input: &L2Input) -> String {
    let memory = memory_section(input.memory_context.as_deref());
    fill_template(
        L2_PROMPT_TEMPLATE,
        &[
            ("candidate_name", &input.candidate_name),
            ("role", &input.role),
            ("l1_summary", input.l1_summary.as_deref().unwrap_or("No L1 result on file")),
            ("memory_context", &memory),
            ("jd", &input.jd),
            ("resume", &input.resume),
            ("transcript", &input.transcript),
        ],
    )
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex compiles"))
}

/// Replaces `{name}` placeholders in one pass. Substituted text is never rescanned,
/// so document text containing `{jd}` or similar stays as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Unit threshold as whole score points.
fn points(threshold: f64) -> String {
    format!("{:.0}", threshold * 100.0)
}

fn memory_section(context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("\n{MEMORY_CONTEXT_HEADING}\n{c}\n"),
        None => String::new(),
    }
}
