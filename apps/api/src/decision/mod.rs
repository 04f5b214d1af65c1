//! Outcome mapping for both review stages.
//!
//! Pure functions: a numeric score plus flag notes in, one outcome label out.
//! Precedence is fixed: hard-block flags, then the reject band, then
//! incomplete-data flags, then unrecognized flag tokens, then the score bands.

pub mod l1;
pub mod l2;

/// Vocabulary used to read flag notes for one stage.
pub struct FlagVocabulary {
    pub hard_block_tokens: &'static [&'static str],
    pub incomplete_tokens: &'static [&'static str],
    /// Tokens that are understood but do not gate.
    pub known_tokens: &'static [&'static str],
    pub hard_block_keywords: &'static [&'static str],
    pub incomplete_keywords: &'static [&'static str],
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FlagSet {
    pub hard_block: bool,
    pub data_incomplete: bool,
    /// Machine-style tokens (`snake_case`) that no rule knows about.
    pub unrecognized: Vec<String>,
}

/// Reads free-text notes and machine tokens into gating flags.
pub fn collect_flags(notes: &[String], vocab: &FlagVocabulary) -> FlagSet {
    let mut flags = FlagSet::default();

    for note in notes {
        let lower = note.trim().to_lowercase();
        if lower.is_empty() {
            continue;
        }

        if is_token(&lower) {
            if vocab.hard_block_tokens.contains(&lower.as_str()) {
                flags.hard_block = true;
            } else if vocab.incomplete_tokens.contains(&lower.as_str()) {
                flags.data_incomplete = true;
            } else if !vocab.known_tokens.contains(&lower.as_str()) {
                flags.unrecognized.push(lower);
            }
            continue;
        }

        if vocab.hard_block_keywords.iter().any(|k| lower.contains(k)) {
            flags.hard_block = true;
        }
        if vocab.incomplete_keywords.iter().any(|k| lower.contains(k)) {
            flags.data_incomplete = true;
        }
    }

    flags
}

/// A single lowercase word joined by underscores, e.g. `hard_block`.
fn is_token(s: &str) -> bool {
    s.contains('_')
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Converts a 0-100 model score to 0.0-1.0. Out-of-range or non-finite scores are `None`.
pub fn unit_score(raw: f64) -> Option<f64> {
    if raw.is_finite() && (0.0..=100.0).contains(&raw) {
        Some(raw / 100.0)
    } else {
        None
    }
}

/// Confidence rounded to two decimals, clamped to 0.0-1.0.
pub fn confidence(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    (score.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

pub fn confidence_band(confidence: f64) -> &'static str {
    if confidence >= 0.8 {
        "High"
    } else if confidence >= 0.5 {
        "Medium"
    } else {
        "Low"
    }
}

/// Normalized direction of a model's free-text recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Hire,
    Reject,
    Hold,
    Unrecognized,
}

impl Recommendation {
    pub fn parse(raw: &str) -> Self {
        let key = raw
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");
        match key.as_str() {
            "hire" | "strong_yes" | "yes" | "shortlist" | "advance" | "move_forward" | "move"
            | "send_to_l2" => Self::Hire,
            "reject" | "no" | "strong_no" | "pass" | "decline" | "drop" | "reject_at_l1" => {
                Self::Reject
            }
            "hold" | "waitlist" | "needs_review" | "maybe" | "lean_yes" => Self::Hold,
            _ => Self::Unrecognized,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hire => "HIRE",
            Self::Reject => "REJECT",
            Self::Hold | Self::Unrecognized => "HOLD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: FlagVocabulary = FlagVocabulary {
        hard_block_tokens: &["hard_block"],
        incomplete_tokens: &["data_incomplete"],
        known_tokens: &["weak_communication"],
        hard_block_keywords: &["not eligible"],
        incomplete_keywords: &["missing resume"],
    };

    fn notes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_collect_flags_tokens_and_keywords() {
        let flags = collect_flags(&notes(&["HARD_BLOCK", "Missing resume in folder"]), &VOCAB);
        assert!(flags.hard_block);
        assert!(flags.data_incomplete);
        assert!(flags.unrecognized.is_empty());
    }

    #[test]
    fn test_collect_flags_unrecognized_token() {
        let flags = collect_flags(&notes(&["visa_sponsorship_pending", "weak_communication"]), &VOCAB);
        assert_eq!(flags.unrecognized, vec!["visa_sponsorship_pending"]);
        assert!(!flags.hard_block);
    }

    #[test]
    fn test_free_text_concern_is_not_a_token() {
        let flags = collect_flags(&notes(&["Limited exposure to Active Directory"]), &VOCAB);
        assert_eq!(flags, FlagSet::default());
    }

    #[test]
    fn test_unit_score() {
        assert_eq!(unit_score(85.0), Some(0.85));
        assert_eq!(unit_score(f64::NAN), None);
        assert_eq!(unit_score(140.0), None);
    }

    #[test]
    fn test_confidence_band() {
        assert_eq!(confidence_band(confidence(0.8)), "High");
        assert_eq!(confidence_band(confidence(0.55)), "Medium");
        assert_eq!(confidence_band(confidence(0.2)), "Low");
        assert_eq!(confidence(1.7), 1.0);
    }

    #[test]
    fn test_recommendation_parse() {
        assert_eq!(Recommendation::parse("Strong Yes"), Recommendation::Hire);
        assert_eq!(Recommendation::parse("MOVE_FORWARD"), Recommendation::Hire);
        assert_eq!(Recommendation::parse("decline"), Recommendation::Reject);
        assert_eq!(Recommendation::parse("waitlist"), Recommendation::Hold);
        assert_eq!(Recommendation::parse("ask again later"), Recommendation::Unrecognized);
    }
}
