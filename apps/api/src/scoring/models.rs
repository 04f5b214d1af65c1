use serde::{Deserialize, Serialize};

/// Structured L1 screening output returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RivaL1Result {
    #[serde(default)]
    pub match_summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub behavioral_signals: Vec<String>,
    #[serde(default)]
    pub communication_signals: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub compensation_alignment: String,
    #[serde(default)]
    pub joining_feasibility: String,
    /// 0-100. Missing scores are held for review rather than guessed.
    #[serde(default)]
    pub fit_score: Option<f64>,
    #[serde(default)]
    pub final_decision: String,
}

impl RivaL1Result {
    /// Every note the outcome mapping reads.
    pub fn gating_notes(&self) -> Vec<String> {
        self.red_flags
            .iter()
            .chain(&self.concerns)
            .chain(&self.risk_flags)
            .cloned()
            .collect()
    }
}

/// Structured L2 deep-dive output returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArjunL2Result {
    #[serde(default)]
    pub leadership_assessment: String,
    #[serde(default)]
    pub technical_capability: String,
    #[serde(default)]
    pub communication_depth: String,
    #[serde(default)]
    pub culture_alignment: String,
    #[serde(default)]
    pub career_potential: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub final_recommendation: String,
    #[serde(default)]
    pub l2_summary: String,
    #[serde(default)]
    pub rationale: String,
}

impl ArjunL2Result {
    pub fn gating_notes(&self) -> Vec<String> {
        self.risk_flags
            .iter()
            .chain(&self.concerns)
            .cloned()
            .collect()
    }
}
