use serde::{Deserialize, Serialize};

use crate::decision::{collect_flags, unit_score, FlagSet, FlagVocabulary, Recommendation};

const L2_VOCABULARY: FlagVocabulary = FlagVocabulary {
    hard_block_tokens: &[
        "hard_block",
        "integrity_violation",
        "mandatory_criteria_failed",
    ],
    incomplete_tokens: &[
        "data_incomplete",
        "missing_info",
        "missing_l2_transcript",
        "missing_noncritical_info",
        "missing_non_critical_info",
    ],
    known_tokens: &["low_confidence", "needs_exec_review"],
    hard_block_keywords: &["hard block", "integrity", "ethics", "cheating", "fake"],
    incomplete_keywords: &["data incomplete", "missing info", "missing transcript"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum L2Outcome {
    Advance,
    Reject,
    HoldExecReview,
    HoldDataIncomplete,
}

#[derive(Debug, Clone, Copy)]
pub struct L2Policy {
    pub advance_score: f64,
    pub advance_communication: f64,
    pub advance_leadership: f64,
    pub reject_score: f64,
    pub reject_communication: f64,
    pub hold_score_min: f64,
    pub hold_communication_min: f64,
}

impl Default for L2Policy {
    fn default() -> Self {
        Self {
            advance_score: 0.8,
            advance_communication: 0.7,
            advance_leadership: 0.75,
            reject_score: 0.5,
            reject_communication: 0.5,
            hold_score_min: 0.65,
            hold_communication_min: 0.6,
        }
    }
}

/// Model output fields the L2 mapping reads.
pub struct L2Signals<'a> {
    pub final_score: f64,
    pub communication_depth: &'a str,
    pub leadership_assessment: &'a str,
    pub recommendation: &'a str,
    pub notes: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub struct L2Decision {
    pub outcome: L2Outcome,
    pub score: f64,
    pub communication: f64,
    pub leadership: Option<f64>,
    pub recommendation: Recommendation,
    pub flags: FlagSet,
    pub reason: String,
}

/// Communication starts from the overall score and is pulled up or down by the assessment wording.
pub fn communication_score(base: f64, assessment: &str) -> f64 {
    let text = assessment.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if has(&["poor", "weak", "unclear", "limited"]) {
        base.min(0.4)
    } else if has(&["excellent", "strong", "exceptional", "very good", "high"]) {
        base.max(0.9)
    } else if has(&["good", "clear", "effective"]) {
        base.max(0.7)
    } else {
        base
    }
}

pub fn leadership_score(assessment: &str) -> Option<f64> {
    let text = assessment.trim().to_lowercase();
    if text.is_empty() || text == "n/a" || text == "na" {
        return None;
    }
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if has(&["low", "weak", "none"]) {
        Some(0.4)
    } else if has(&["high", "strong", "excellent", "proven"]) {
        Some(0.9)
    } else if has(&["medium", "moderate", "developing"]) {
        Some(0.7)
    } else {
        None
    }
}

pub fn decide_l2(policy: &L2Policy, signals: &L2Signals<'_>) -> L2Decision {
    let flags = collect_flags(signals.notes, &L2_VOCABULARY);
    let score = unit_score(signals.final_score);
    let base = score.unwrap_or(0.0);
    let communication = communication_score(base, signals.communication_depth);
    let leadership = leadership_score(signals.leadership_assessment);
    let recommendation = Recommendation::parse(signals.recommendation);

    let leadership_ok = leadership
        .map(|l| l >= policy.advance_leadership)
        .unwrap_or(true);

    let (outcome, reason) = match score {
        _ if flags.hard_block => (L2Outcome::Reject, "hard-block flag present".to_string()),
        Some(s) if s <= policy.reject_score => (
            L2Outcome::Reject,
            format!("score {s:.2} at or below {:.2}", policy.reject_score),
        ),
        _ if recommendation == Recommendation::Reject => {
            (L2Outcome::Reject, "model recommends reject".to_string())
        }
        _ if flags.data_incomplete => (
            L2Outcome::HoldDataIncomplete,
            "incomplete-data flag present".to_string(),
        ),
        None => (
            L2Outcome::HoldExecReview,
            format!("unusable final score {}", signals.final_score),
        ),
        _ if communication <= policy.reject_communication => (
            L2Outcome::Reject,
            format!("communication {communication:.2} at or below {:.2}", policy.reject_communication),
        ),
        _ if !flags.unrecognized.is_empty() => (
            L2Outcome::HoldExecReview,
            format!("unrecognized flags: {}", flags.unrecognized.join(", ")),
        ),
        _ if recommendation == Recommendation::Unrecognized => (
            L2Outcome::HoldExecReview,
            format!("unrecognized recommendation '{}'", signals.recommendation),
        ),
        Some(s)
            if s >= policy.advance_score
                && communication >= policy.advance_communication
                && leadership_ok
                && recommendation == Recommendation::Hire =>
        {
            (L2Outcome::Advance, format!("score {s:.2} with strong signals"))
        }
        Some(s)
            if s >= policy.hold_score_min
                && communication >= policy.hold_communication_min =>
        {
            (
                L2Outcome::HoldExecReview,
                format!("score {s:.2} needs executive review"),
            )
        }
        Some(s) => (L2Outcome::Reject, format!("score {s:.2} below hold band")),
    };

    L2Decision {
        outcome,
        score: base,
        communication,
        leadership,
        recommendation,
        flags,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals<'a>(score: f64, comm: &'a str, lead: &'a str, rec: &'a str, notes: &'a [String]) -> L2Signals<'a> {
        L2Signals {
            final_score: score,
            communication_depth: comm,
            leadership_assessment: lead,
            recommendation: rec,
            notes,
        }
    }

    #[test]
    fn test_strong_candidate_advances() {
        let d = decide_l2(&L2Policy::default(), &signals(86.0, "Clear and structured", "Strong ownership", "HIRE", &[]));
        assert_eq!(d.outcome, L2Outcome::Advance);
        assert_eq!(d.leadership, Some(0.9));
    }

    #[test]
    fn test_advance_requires_hire_recommendation() {
        let d = decide_l2(&L2Policy::default(), &signals(86.0, "excellent", "", "HOLD", &[]));
        assert_eq!(d.outcome, L2Outcome::HoldExecReview);
    }

    #[test]
    fn test_low_leadership_blocks_advance() {
        let d = decide_l2(&L2Policy::default(), &signals(88.0, "excellent", "weak delegation", "HIRE", &[]));
        assert_eq!(d.outcome, L2Outcome::HoldExecReview);
    }

    #[test]
    fn test_reject_on_low_score_or_reject_recommendation() {
        let d = decide_l2(&L2Policy::default(), &signals(50.0, "excellent", "", "HIRE", &[]));
        assert_eq!(d.outcome, L2Outcome::Reject);
        let d = decide_l2(&L2Policy::default(), &signals(90.0, "excellent", "", "strong_no", &[]));
        assert_eq!(d.outcome, L2Outcome::Reject);
    }

    #[test]
    fn test_poor_communication_rejects() {
        let d = decide_l2(&L2Policy::default(), &signals(85.0, "poor articulation", "", "HIRE", &[]));
        assert_eq!(d.communication, 0.4);
        assert_eq!(d.outcome, L2Outcome::Reject);
    }

    #[test]
    fn test_integrity_flag_rejects() {
        let notes = vec!["Possible cheating during the coding exercise".to_string()];
        let d = decide_l2(&L2Policy::default(), &signals(95.0, "excellent", "high", "HIRE", &notes));
        assert_eq!(d.outcome, L2Outcome::Reject);
    }

    #[test]
    fn test_missing_info_holds() {
        let notes = vec!["missing_l2_transcript".to_string()];
        let d = decide_l2(&L2Policy::default(), &signals(85.0, "good", "", "HIRE", &notes));
        assert_eq!(d.outcome, L2Outcome::HoldDataIncomplete);
    }

    #[test]
    fn test_unrecognized_recommendation_holds() {
        let d = decide_l2(&L2Policy::default(), &signals(90.0, "excellent", "", "ask the panel", &[]));
        assert_eq!(d.outcome, L2Outcome::HoldExecReview);
    }

    #[test]
    fn test_below_hold_band_rejects() {
        let d = decide_l2(&L2Policy::default(), &signals(60.0, "", "", "HOLD", &[]));
        assert_eq!(d.outcome, L2Outcome::Reject);
    }

    #[test]
    fn test_leadership_score_na() {
        assert_eq!(leadership_score("N/A"), None);
        assert_eq!(leadership_score("Moderate"), Some(0.7));
    }
}
