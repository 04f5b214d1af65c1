use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{FolderLayout, MemoryScope};
use crate::decision::l1::L1Policy;
use crate::decision::l2::L2Policy;
use crate::decision_log::DecisionLog;
use crate::errors::AppError;
use crate::memory::in_memory::InMemoryMemoryStore;
use crate::memory::TalentMemory;
use crate::pipeline::PipelineContext;
use crate::scoring::models::{ArjunL2Result, RivaL1Result};
use crate::scoring::{CandidateScorer, L1Input, L2Input};
use crate::sheets::dashboard::Dashboard;
use crate::sheets::memory::InMemorySheets;
use crate::storage::memory::InMemoryFileStore;

/// Scorer answering from per-candidate scripts.
/// Unscripted candidates get a middling score; `failing` candidates get an LLM error.
#[derive(Default)]
pub struct ScriptedScorer {
    l1: HashMap<String, RivaL1Result>,
    l2: HashMap<String, ArjunL2Result>,
    failing: HashSet<String>,
}

impl ScriptedScorer {
    pub fn l1(mut self, name: &str, fit_score: f64, concerns: &[&str]) -> Self {
        self.l1.insert(
            name.to_string(),
            RivaL1Result {
                match_summary: format!("{name} fits the role"),
                strengths: vec!["Ticketing".into()],
                concerns: concerns.iter().map(|c| c.to_string()).collect(),
                fit_score: Some(fit_score),
                ..Default::default()
            },
        );
        self
    }

    pub fn l2(mut self, name: &str, final_score: f64, recommendation: &str) -> Self {
        self.l2.insert(
            name.to_string(),
            ArjunL2Result {
                leadership_assessment: "Strong ownership".into(),
                communication_depth: "Clear and structured".into(),
                strengths: vec!["Incident handling".into()],
                final_score: Some(final_score),
                final_recommendation: recommendation.into(),
                l2_summary: format!("{name} deep dive"),
                ..Default::default()
            },
        );
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    fn check(&self, name: &str) -> Result<(), AppError> {
        if self.failing.contains(name) {
            return Err(AppError::Llm(format!("scripted failure for {name}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CandidateScorer for ScriptedScorer {
    async fn score_l1(&self, input: &L1Input) -> Result<RivaL1Result, AppError> {
        self.check(&input.candidate_name)?;
        Ok(self
            .l1
            .get(&input.candidate_name)
            .cloned()
            .unwrap_or_else(|| RivaL1Result {
                fit_score: Some(55.0),
                ..Default::default()
            }))
    }

    async fn score_l2(&self, input: &L2Input) -> Result<ArjunL2Result, AppError> {
        self.check(&input.candidate_name)?;
        Ok(self
            .l2
            .get(&input.candidate_name)
            .cloned()
            .unwrap_or_else(|| ArjunL2Result {
                final_score: Some(70.0),
                final_recommendation: "HOLD".into(),
                ..Default::default()
            }))
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryFileStore>,
    pub sheets: Arc<InMemorySheets>,
    pub memory: Arc<InMemoryMemoryStore>,
    pub ctx: PipelineContext,
}

/// Pipeline wired to in-memory collaborators; dashboard and decision log share sheet `dash`.
pub fn fixture(scorer: ScriptedScorer) -> Fixture {
    let store = Arc::new(InMemoryFileStore::new());
    let sheets = Arc::new(InMemorySheets::new());
    let memory = Arc::new(InMemoryMemoryStore::default());
    let ctx = PipelineContext {
        store: store.clone(),
        scorer: Arc::new(scorer),
        dashboard: Some(Dashboard::new(sheets.clone(), "dash".into())),
        decision_log: Some(DecisionLog::new(sheets.clone(), "dash".into())),
        memory: TalentMemory::new(memory.clone(), MemoryScope::Full),
        folders: FolderLayout {
            roles: vec!["IT Support".into()],
            ..Default::default()
        },
        l1_policy: L1Policy::default(),
        l2_policy: L2Policy::default(),
    };
    Fixture {
        store,
        sheets,
        memory,
        ctx,
    }
}

/// Resume, JD and first-round transcript under L1 pending.
pub fn put_l1_candidate(store: &InMemoryFileStore, name: &str) {
    let base = format!("L1 Pending Review/IT Support/{name}");
    store.put(&format!("{base}/resume.txt"), "5 years of helpdesk support");
    store.put(&format!("{base}/jd.txt"), "Support 200 laptops and AD accounts");
    store.put(
        &format!("{base}/interview_transcript.txt"),
        "Q: How do you triage tickets?",
    );
}

/// Resume, JD, L2 transcript and optionally an L1 result under L2 pending.
pub fn put_l2_candidate(store: &InMemoryFileStore, name: &str, l1_score: Option<f64>) {
    let base = format!("L2 Pending Review/IT Support/{name}");
    store.put(&format!("{base}/resume.txt"), "5 years of helpdesk support");
    store.put(&format!("{base}/jd.txt"), "Support 200 laptops and AD accounts");
    store.put(
        &format!("{base}/l2_interview_transcript.txt"),
        "Q: Walk me through a major outage",
    );
    if let Some(score) = l1_score {
        store.put(
            &format!("{base}/l1_result.json"),
            serde_json::json!({
                "overall_score": score,
                "recommendation": "SEND_TO_L2",
                "pipeline_recommendation": "MOVE",
            })
            .to_string(),
        );
    }
}
