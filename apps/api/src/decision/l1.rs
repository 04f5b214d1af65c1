use serde::{Deserialize, Serialize};

use crate::decision::{collect_flags, unit_score, FlagSet, FlagVocabulary};

const L1_VOCABULARY: FlagVocabulary = FlagVocabulary {
    hard_block_tokens: &["hard_block", "mandatory_criteria_failed"],
    incomplete_tokens: &[
        "data_incomplete",
        "missing_non_critical_info",
        "missing_noncritical_info",
    ],
    known_tokens: &["low_confidence", "jd_mismatch", "ambiguous_signals"],
    hard_block_keywords: &["hard block", "mandatory", "not eligible", "ineligible"],
    incomplete_keywords: &[
        "data incomplete",
        "missing resume",
        "missing jd",
        "missing transcript",
        "no transcript",
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum L1Outcome {
    Move,
    Reject,
    HoldManualReview,
    HoldDataIncomplete,
}

/// Score bands for L1. Scores are on a 0.0-1.0 scale.
#[derive(Debug, Clone, Copy)]
pub struct L1Policy {
    pub advance_threshold: f64,
    pub reject_threshold: f64,
}

impl Default for L1Policy {
    fn default() -> Self {
        Self {
            advance_threshold: 0.7,
            reject_threshold: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct L1Decision {
    pub outcome: L1Outcome,
    /// Unit score, 0.0 when the model score was unusable.
    pub score: f64,
    pub flags: FlagSet,
    pub reason: String,
}

/// Maps a 0-100 fit score plus the model's red flags, concerns and risk flags to an outcome.
pub fn decide_l1(policy: &L1Policy, fit_score: f64, notes: &[String]) -> L1Decision {
    let flags = collect_flags(notes, &L1_VOCABULARY);
    let score = unit_score(fit_score);

    let (outcome, reason) = match score {
        _ if flags.hard_block => (L1Outcome::Reject, "hard-block flag present".to_string()),
        Some(s) if s <= policy.reject_threshold => (
            L1Outcome::Reject,
            format!("score {s:.2} at or below {:.2}", policy.reject_threshold),
        ),
        _ if flags.data_incomplete => (
            L1Outcome::HoldDataIncomplete,
            "incomplete-data flag present".to_string(),
        ),
        None => (
            L1Outcome::HoldManualReview,
            format!("unusable fit score {fit_score}"),
        ),
        _ if !flags.unrecognized.is_empty() => (
            L1Outcome::HoldManualReview,
            format!("unrecognized flags: {}", flags.unrecognized.join(", ")),
        ),
        Some(s) if s >= policy.advance_threshold => (
            L1Outcome::Move,
            format!("score {s:.2} at or above {:.2}", policy.advance_threshold),
        ),
        Some(s) => (
            L1Outcome::HoldManualReview,
            format!("score {s:.2} between bands"),
        ),
    };

    L1Decision {
        outcome,
        score: score.unwrap_or(0.0),
        flags,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_high_score_moves() {
        let d = decide_l1(&L1Policy::default(), 82.0, &notes(&["Limited scripting"]));
        assert_eq!(d.outcome, L1Outcome::Move);
        assert_eq!(d.score, 0.82);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(decide_l1(&L1Policy::default(), 70.0, &[]).outcome, L1Outcome::Move);
        assert_eq!(decide_l1(&L1Policy::default(), 40.0, &[]).outcome, L1Outcome::Reject);
    }

    #[test]
    fn test_middle_band_holds() {
        let d = decide_l1(&L1Policy::default(), 55.0, &[]);
        assert_eq!(d.outcome, L1Outcome::HoldManualReview);
    }

    #[test]
    fn test_hard_block_rejects_despite_high_score() {
        let d = decide_l1(
            &L1Policy::default(),
            95.0,
            &notes(&["Candidate is not eligible to work on site", "data_incomplete"]),
        );
        assert_eq!(d.outcome, L1Outcome::Reject);
    }

    #[test]
    fn test_low_score_rejects_regardless_of_incomplete_flag() {
        let d = decide_l1(&L1Policy::default(), 20.0, &notes(&["data_incomplete"]));
        assert_eq!(d.outcome, L1Outcome::Reject);
    }

    #[test]
    fn test_incomplete_flag_holds_high_score() {
        let d = decide_l1(&L1Policy::default(), 90.0, &notes(&["No transcript attached"]));
        assert_eq!(d.outcome, L1Outcome::HoldDataIncomplete);
    }

    #[test]
    fn test_unrecognized_token_holds() {
        let d = decide_l1(&L1Policy::default(), 90.0, &notes(&["visa_check_pending"]));
        assert_eq!(d.outcome, L1Outcome::HoldManualReview);
    }

    #[test]
    fn test_nan_score_holds() {
        let d = decide_l1(&L1Policy::default(), f64::NAN, &[]);
        assert_eq!(d.outcome, L1Outcome::HoldManualReview);
        assert_eq!(d.score, 0.0);
    }

    #[test]
    fn test_custom_policy() {
        let policy = L1Policy {
            advance_threshold: 0.9,
            reject_threshold: 0.3,
        };
        assert_eq!(decide_l1(&policy, 85.0, &[]).outcome, L1Outcome::HoldManualReview);
    }
}
