//! Optional longitudinal memory for candidates and roles.
//!
//! `TalentMemory` wraps an injectable `MemoryStore`. When memory is disabled or the
//! database is unreachable the store is `NoopMemoryStore` and every call is a no-op.
//! Store failures are logged and never fail a pipeline run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::config::MemoryScope;

#[cfg(test)]
pub mod in_memory;
pub mod postgres;

const SNAPSHOT_CLIP_CHARS: usize = 2000;
const RECENT_EVENT_LIMIT: i64 = 3;
const MAX_PATTERNS: usize = 10;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CandidateProfile {
    pub candidate_id: Uuid,
    pub name: String,
    pub role: String,
    pub last_outcome: Option<String>,
    pub strengths: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CandidateEvent {
    pub candidate_id: Uuid,
    pub run_id: Uuid,
    pub stage: String,
    pub agent: String,
    pub inputs_hash: String,
    pub score: f64,
    pub decision: String,
    pub confidence: f64,
    pub artifacts: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleProfile {
    pub role: String,
    pub rubric_version: i32,
    pub competency_weights: serde_json::Value,
    pub common_rejection_reasons: Vec<String>,
    pub top_performer_patterns: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinalDecision {
    pub candidate_id: Uuid,
    pub role: String,
    pub candidate_name: String,
    pub final_status: String,
    pub next_action: String,
    pub decided_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Store trait
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn candidate_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<CandidateProfile>, MemoryError>;

    /// Newest first.
    async fn recent_events(
        &self,
        candidate_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CandidateEvent>, MemoryError>;

    async fn role_profile(&self, role: &str) -> Result<Option<RoleProfile>, MemoryError>;

    async fn upsert_candidate_profile(&self, profile: &CandidateProfile) -> Result<(), MemoryError>;

    async fn record_event(&self, event: &CandidateEvent) -> Result<(), MemoryError>;

    async fn upsert_role_profile(&self, profile: &RoleProfile) -> Result<(), MemoryError>;

    /// Keyed by candidate and role; a later decision replaces the earlier one.
    async fn upsert_final_decision(&self, decision: &FinalDecision) -> Result<(), MemoryError>;
}

pub struct NoopMemoryStore;

#[async_trait]
impl MemoryStore for NoopMemoryStore {
    async fn candidate_profile(&self, _: Uuid) -> Result<Option<CandidateProfile>, MemoryError> {
        Ok(None)
    }

    async fn recent_events(&self, _: Uuid, _: i64) -> Result<Vec<CandidateEvent>, MemoryError> {
        Ok(Vec::new())
    }

    async fn role_profile(&self, _: &str) -> Result<Option<RoleProfile>, MemoryError> {
        Ok(None)
    }

    async fn upsert_candidate_profile(&self, _: &CandidateProfile) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn record_event(&self, _: &CandidateEvent) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn upsert_role_profile(&self, _: &RoleProfile) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn upsert_final_decision(&self, _: &FinalDecision) -> Result<(), MemoryError> {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TalentMemory service
// ────────────────────────────────────────────────────────────────────────────

/// One evaluation worth remembering.
#[derive(Debug, Clone)]
pub struct EvaluationMemory {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub role: String,
    pub run_id: Uuid,
    pub stage: String,
    pub agent: String,
    pub inputs_snapshot: String,
    pub score: f64,
    pub decision: String,
    pub confidence: f64,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub advanced: bool,
    pub rejected: bool,
    pub artifacts: serde_json::Value,
}

#[derive(Clone)]
pub struct TalentMemory {
    store: Arc<dyn MemoryStore>,
    scope: MemoryScope,
}

impl TalentMemory {
    pub fn new(store: Arc<dyn MemoryStore>, scope: MemoryScope) -> Self {
        Self { store, scope }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopMemoryStore), MemoryScope::Full)
    }

    /// Prompt context lines for a candidate and role, or `None` when nothing is known.
    pub async fn context_for(&self, candidate_id: Uuid, role: &str) -> Option<String> {
        let mut lines = Vec::new();

        if self.scope.includes_candidate() {
            match self.store.candidate_profile(candidate_id).await {
                Ok(Some(profile)) => {
                    lines.push(format!(
                        "Candidate profile: name={}, role={}, last_outcome={}",
                        profile.name,
                        profile.role,
                        profile.last_outcome.as_deref().unwrap_or("none")
                    ));
                    if !profile.strengths.is_empty() {
                        lines.push(format!("Known strengths: {}", profile.strengths.join(", ")));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Memory lookup failed for candidate {candidate_id}: {e}"),
            }

            match self.store.recent_events(candidate_id, RECENT_EVENT_LIMIT).await {
                Ok(events) => {
                    for event in events {
                        lines.push(format!(
                            "Recent {} decision ({}) => {} (confidence={:.2})",
                            event.stage, event.agent, event.decision, event.confidence
                        ));
                    }
                }
                Err(e) => warn!("Memory event lookup failed for candidate {candidate_id}: {e}"),
            }
        }

        if self.scope.includes_role() {
            match self.store.role_profile(role).await {
                Ok(Some(profile)) => {
                    lines.push(format!(
                        "Role rubric v{}: weights={}",
                        profile.rubric_version, profile.competency_weights
                    ));
                    if !profile.common_rejection_reasons.is_empty() {
                        lines.push(format!(
                            "Common rejection reasons: {}",
                            profile.common_rejection_reasons.join("; ")
                        ));
                    }
                    if !profile.top_performer_patterns.is_empty() {
                        lines.push(format!(
                            "Top performer traits: {}",
                            profile.top_performer_patterns.join("; ")
                        ));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Memory lookup failed for role '{role}': {e}"),
            }
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Stores the evaluation in every table the scope covers.
    pub async fn remember(&self, evaluation: &EvaluationMemory) {
        if self.scope.includes_candidate() {
            let profile = CandidateProfile {
                candidate_id: evaluation.candidate_id,
                name: evaluation.candidate_name.clone(),
                role: evaluation.role.clone(),
                last_outcome: Some(evaluation.decision.clone()),
                strengths: evaluation.strengths.clone(),
                updated_at: Utc::now(),
            };
            if let Err(e) = self.store.upsert_candidate_profile(&profile).await {
                warn!("Failed to store candidate profile: {e}");
            }

            let event = CandidateEvent {
                candidate_id: evaluation.candidate_id,
                run_id: evaluation.run_id,
                stage: evaluation.stage.clone(),
                agent: evaluation.agent.clone(),
                inputs_hash: inputs_hash(&evaluation.inputs_snapshot),
                score: evaluation.score,
                decision: evaluation.decision.clone(),
                confidence: evaluation.confidence,
                artifacts: evaluation.artifacts.clone(),
                created_at: Utc::now(),
            };
            if let Err(e) = self.store.record_event(&event).await {
                warn!("Failed to store candidate event: {e}");
            }
        }

        if self.scope.includes_role() {
            if let Err(e) = self.update_role_profile(evaluation).await {
                warn!("Failed to update role profile for '{}': {e}", evaluation.role);
            }
        }
    }

    async fn update_role_profile(&self, evaluation: &EvaluationMemory) -> Result<(), MemoryError> {
        let mut profile = self
            .store
            .role_profile(&evaluation.role)
            .await?
            .unwrap_or_else(|| RoleProfile {
                role: evaluation.role.clone(),
                rubric_version: 1,
                competency_weights: serde_json::json!({
                    "technical": 0.4,
                    "communication": 0.3,
                    "culture": 0.3
                }),
                common_rejection_reasons: Vec::new(),
                top_performer_patterns: Vec::new(),
                notes: None,
            });

        if evaluation.rejected {
            merge_patterns(&mut profile.common_rejection_reasons, &evaluation.concerns);
        }
        if evaluation.advanced {
            merge_patterns(&mut profile.top_performer_patterns, &evaluation.strengths);
        }
        self.store.upsert_role_profile(&profile).await
    }

    pub async fn record_final_decision(&self, decision: &FinalDecision) {
        if let Err(e) = self.store.upsert_final_decision(decision).await {
            warn!("Failed to store final decision for {}: {e}", decision.candidate_name);
        }
    }
}

/// Adds new items, most recent first, keeping the list bounded.
fn merge_patterns(existing: &mut Vec<String>, new_items: &[String]) {
    for item in new_items.iter().rev().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !existing.iter().any(|e| e.eq_ignore_ascii_case(item)) {
            existing.insert(0, item.to_string());
        }
    }
    existing.truncate(MAX_PATTERNS);
}

/// SHA-256 of the clipped input snapshot.
pub fn inputs_hash(snapshot: &str) -> String {
    let clipped: String = snapshot.chars().take(SNAPSHOT_CLIP_CHARS).collect();
    format!("{:x}", Sha256::digest(clipped.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::in_memory::InMemoryMemoryStore;

    fn evaluation(id: Uuid, decision: &str, advanced: bool) -> EvaluationMemory {
        EvaluationMemory {
            candidate_id: id,
            candidate_name: "Priya Shah".into(),
            role: "IT Support".into(),
            run_id: Uuid::new_v4(),
            stage: "L1".into(),
            agent: "Riva".into(),
            inputs_snapshot: "resume text".into(),
            score: 0.82,
            decision: decision.into(),
            confidence: 0.82,
            strengths: vec!["Ticketing".into()],
            concerns: vec!["Night shifts".into()],
            advanced,
            rejected: !advanced,
            artifacts: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_disabled_memory_has_no_context() {
        let memory = TalentMemory::disabled();
        memory.remember(&evaluation(Uuid::new_v4(), "SEND_TO_L2", true)).await;
        assert!(memory.context_for(Uuid::new_v4(), "IT Support").await.is_none());
    }

    #[tokio::test]
    async fn test_context_after_remember() {
        let store = Arc::new(InMemoryMemoryStore::default());
        let memory = TalentMemory::new(store.clone(), MemoryScope::Full);
        let id = Uuid::new_v4();
        memory.remember(&evaluation(id, "SEND_TO_L2", true)).await;

        let context = memory.context_for(id, "IT Support").await.unwrap();
        assert!(context.contains("Candidate profile: name=Priya Shah, role=IT Support, last_outcome=SEND_TO_L2"));
        assert!(context.contains("Known strengths: Ticketing"));
        assert!(context.contains("Recent L1 decision (Riva) => SEND_TO_L2 (confidence=0.82)"));
        assert!(context.contains("Role rubric v1"));
        assert!(context.contains("Top performer traits: Ticketing"));
    }

    #[tokio::test]
    async fn test_role_only_scope_skips_candidate() {
        let store = Arc::new(InMemoryMemoryStore::default());
        let memory = TalentMemory::new(store.clone(), MemoryScope::RoleOnly);
        let id = Uuid::new_v4();
        memory.remember(&evaluation(id, "REJECT_AT_L1", false)).await;

        assert!(store.events_for(id).is_empty());
        let context = memory.context_for(id, "IT Support").await.unwrap();
        assert!(!context.contains("Candidate profile"));
        assert!(context.contains("Common rejection reasons: Night shifts"));
    }

    #[test]
    fn test_inputs_hash_clips_snapshot() {
        let long_a = format!("{}{}", "x".repeat(2000), "a");
        let long_b = format!("{}{}", "x".repeat(2000), "b");
        assert_eq!(inputs_hash(&long_a), inputs_hash(&long_b));
        assert_ne!(inputs_hash("a"), inputs_hash("b"));
    }

    #[test]
    fn test_merge_patterns_dedupes_and_bounds() {
        let mut existing = vec!["ticketing".to_string()];
        merge_patterns(&mut existing, &["Ticketing".into(), "AD".into()]);
        assert_eq!(existing, vec!["AD", "ticketing"]);

        let many: Vec<String> = (0..20).map(|i| format!("p{i}")).collect();
        merge_patterns(&mut existing, &many);
        assert_eq!(existing.len(), MAX_PATTERNS);
        assert_eq!(existing[0], "p0");
    }
}
