//! Intent classification for chat messages.
//!
//! Ordered keyword rules run first; the first match wins. Only when no rule
//! matches is the optional model fallback consulted, and any failure there
//! degrades to `Unknown`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chat::prompts::INTENT_PROMPT_TEMPLATE;
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, CLASSIFY_MAX_TOKENS};
use crate::pipeline::summary::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Greeting,
    Help,
    L1EvalSingle,
    L1EvalBatchStatus,
    L2EvalSingle,
    L2Compare,
    PipelineStatus,
    Debug,
    SmallTalk,
    WorkQuery,
    Unknown,
}

impl Intent {
    /// Parses a model-supplied label; anything unrecognized is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(label.trim().to_uppercase()))
            .unwrap_or(Intent::Unknown)
    }

    /// Whether the bot for `stage` answers this intent from pipeline data.
    pub fn is_workflow_for(&self, stage: Stage) -> bool {
        match self {
            Intent::WorkQuery | Intent::PipelineStatus | Intent::Debug => true,
            Intent::L1EvalSingle | Intent::L1EvalBatchStatus => stage == Stage::L1,
            Intent::L2EvalSingle | Intent::L2Compare => stage == Stage::L2,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntentDecision {
    pub intent: Intent,
    pub confidence: f64,
    pub notes: String,
}

impl IntentDecision {
    fn rule(intent: Intent, confidence: f64, notes: &str) -> Self {
        Self {
            intent,
            confidence,
            notes: notes.to_string(),
        }
    }

    fn fallback() -> Self {
        Self::rule(Intent::Unknown, 0.0, "fallback")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword rules
// ────────────────────────────────────────────────────────────────────────────

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "hi riva",
    "hi arjun",
    "hey riva",
    "hey arjun",
];
const HELP: &[&str] = &["help", "what can you do"];
const L1_SINGLE: &[&str] = &["evaluate", "resume", "jd", "summary", "status", "candidate"];
const L1_BATCH: &[&str] = &["batch", "run l1", "daily run"];
const L2_SINGLE: &[&str] = &["deep dive", "l2", "second opinion", "shortlist"];
const L2_COMPARE: &[&str] = &["compare", "comparison", "versus", "vs ", "stack rank"];
const WORK: &[&str] = &[
    "candidate", "role", "status", "outcome", "result", "ready", "review", "batch", "pipeline",
    "summary", "hire", "decision", "run l2", "run l1", "latest",
];
const SMALL_TALK: &[&str] = &["thanks", "thank you", "great", "awesome"];

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

/// Applies the keyword rules in order. `None` when nothing matches.
pub fn rule_intent(text: &str, stage: Stage) -> Option<IntentDecision> {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if GREETINGS.contains(&normalized.as_str())
        || normalized.starts_with("hi ")
        || normalized.starts_with("hello ")
    {
        return Some(IntentDecision::rule(Intent::Greeting, 1.0, "rule:greeting"));
    }
    if contains_any(&normalized, HELP) {
        return Some(IntentDecision::rule(Intent::Help, 0.9, "rule:help"));
    }

    match stage {
        Stage::L1 => {
            if contains_any(&normalized, L1_SINGLE) {
                return Some(IntentDecision::rule(Intent::L1EvalSingle, 0.75, "rule:l1_eval"));
            }
            if contains_any(&normalized, L1_BATCH) {
                return Some(IntentDecision::rule(Intent::L1EvalBatchStatus, 0.7, "rule:l1_batch"));
            }
        }
        Stage::L2 => {
            if contains_any(&normalized, L2_SINGLE) {
                return Some(IntentDecision::rule(Intent::L2EvalSingle, 0.75, "rule:l2_eval"));
            }
            if contains_any(&normalized, L2_COMPARE) {
                return Some(IntentDecision::rule(Intent::L2Compare, 0.72, "rule:l2_compare"));
            }
        }
    }

    if contains_any(&normalized, WORK) {
        return Some(IntentDecision::rule(Intent::WorkQuery, 0.65, "rule:work_query"));
    }
    if contains_any(&normalized, SMALL_TALK) {
        return Some(IntentDecision::rule(Intent::SmallTalk, 0.6, "rule:smalltalk"));
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Model fallback
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait IntentFallback: Send + Sync {
    async fn classify(&self, text: &str, stage: Stage) -> Result<IntentDecision, AppError>;
}

#[derive(Debug, Deserialize)]
struct ClassifierAnswer {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    notes: String,
}

pub struct LlmIntentFallback(pub LlmClient);

#[async_trait]
impl IntentFallback for LlmIntentFallback {
    async fn classify(&self, text: &str, stage: Stage) -> Result<IntentDecision, AppError> {
        let prompt = INTENT_PROMPT_TEMPLATE
            .replace("{message}", text)
            .replace("{bot}", &stage.agent().to_uppercase());
        let answer: ClassifierAnswer = self
            .0
            .call_json(&prompt, JSON_ONLY_SYSTEM, CLASSIFY_MAX_TOKENS)
            .await?;
        Ok(IntentDecision {
            intent: Intent::from_label(&answer.intent),
            confidence: answer.confidence.clamp(0.0, 1.0),
            notes: answer.notes,
        })
    }
}

/// Rules first, then the fallback if one is configured. Never fails.
pub async fn decide_intent(
    text: &str,
    stage: Stage,
    fallback: Option<&dyn IntentFallback>,
) -> IntentDecision {
    if let Some(decision) = rule_intent(text, stage) {
        debug!(intent = ?decision.intent, notes = %decision.notes, "Intent matched by rule");
        return decision;
    }
    if text.trim().is_empty() {
        return IntentDecision::fallback();
    }
    let Some(fallback) = fallback else {
        return IntentDecision::fallback();
    };
    match fallback.classify(text, stage).await {
        Ok(decision) => decision,
        Err(e) => {
            warn!(bot = stage.agent(), "Intent fallback failed: {e}");
            IntentDecision::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFallback(Result<&'static str, ()>);

    #[async_trait]
    impl IntentFallback for FixedFallback {
        async fn classify(&self, _text: &str, _stage: Stage) -> Result<IntentDecision, AppError> {
            match self.0 {
                Ok(label) => Ok(IntentDecision {
                    intent: Intent::from_label(label),
                    confidence: 0.8,
                    notes: "model".into(),
                }),
                Err(()) => Err(AppError::Llm("timeout".into())),
            }
        }
    }

    fn intent(text: &str, stage: Stage) -> Option<Intent> {
        rule_intent(text, stage).map(|d| d.intent)
    }

    #[test]
    fn test_greetings() {
        assert_eq!(intent("Hi", Stage::L1), Some(Intent::Greeting));
        assert_eq!(intent("hello there", Stage::L2), Some(Intent::Greeting));
        assert_eq!(intent("good morning", Stage::L2), Some(Intent::Greeting));
        let decision = rule_intent("hey arjun", Stage::L2).unwrap();
        assert_eq!(decision.confidence, 1.0);
    }

    #[test]
    fn test_help_beats_stage_rules() {
        assert_eq!(intent("help me evaluate someone", Stage::L1), Some(Intent::Help));
        assert_eq!(intent("what can you do?", Stage::L2), Some(Intent::Help));
    }

    #[test]
    fn test_stage_specific_rules() {
        assert_eq!(intent("evaluate Priya Shah", Stage::L1), Some(Intent::L1EvalSingle));
        assert_eq!(intent("how did the daily run go", Stage::L1), Some(Intent::L1EvalBatchStatus));
        assert_eq!(intent("deep dive on Aisha", Stage::L2), Some(Intent::L2EvalSingle));
        assert_eq!(intent("compare John vs Jane", Stage::L2), Some(Intent::L2Compare));
        // Riva rules do not apply to Arjun
        assert_eq!(intent("daily run", Stage::L2), None);
    }

    #[test]
    fn test_work_query_and_small_talk() {
        assert_eq!(intent("who is ready", Stage::L2), Some(Intent::WorkQuery));
        assert_eq!(intent("thanks a lot", Stage::L1), Some(Intent::SmallTalk));
        assert_eq!(intent("the weather is nice", Stage::L1), None);
    }

    #[test]
    fn test_rules_are_deterministic() {
        for _ in 0..3 {
            let decision = rule_intent("latest pipeline outcome", Stage::L2).unwrap();
            assert_eq!(decision.intent, Intent::WorkQuery);
            assert_eq!(decision.confidence, 0.65);
        }
    }

    #[test]
    fn test_from_label() {
        assert_eq!(Intent::from_label("L1_EVAL_SINGLE"), Intent::L1EvalSingle);
        assert_eq!(Intent::from_label("small_talk"), Intent::SmallTalk);
        assert_eq!(Intent::from_label("ORDER_PIZZA"), Intent::Unknown);
    }

    #[test]
    fn test_workflow_intents_per_bot() {
        assert!(Intent::L1EvalSingle.is_workflow_for(Stage::L1));
        assert!(!Intent::L1EvalSingle.is_workflow_for(Stage::L2));
        assert!(Intent::WorkQuery.is_workflow_for(Stage::L2));
        assert!(!Intent::Greeting.is_workflow_for(Stage::L1));
    }

    #[tokio::test]
    async fn test_unmatched_without_fallback_is_unknown() {
        let decision = decide_intent("the weather is nice", Stage::L1, None).await;
        assert_eq!(decision, IntentDecision::fallback());
    }

    #[tokio::test]
    async fn test_fallback_used_only_when_rules_miss() {
        let fallback = FixedFallback(Ok("DEBUG"));
        let decision = decide_intent("the weather is nice", Stage::L1, Some(&fallback)).await;
        assert_eq!(decision.intent, Intent::Debug);

        let decision = decide_intent("hi", Stage::L1, Some(&fallback)).await;
        assert_eq!(decision.intent, Intent::Greeting);
    }

    #[tokio::test]
    async fn test_failing_fallback_degrades_to_unknown() {
        let fallback = FixedFallback(Err(()));
        let decision = decide_intent("the weather is nice", Stage::L2, Some(&fallback)).await;
        assert_eq!(decision.intent, Intent::Unknown);
        assert_eq!(decision.notes, "fallback");
    }
}
