//! Candidate and role extraction from free chat text.

use std::sync::OnceLock;

use regex::Regex;

/// Leading words that address the bot rather than carry the request.
const NOISE_PREFIXES: &[&str] = &[
    "hey riva", "hi riva", "hello riva", "riva", "hey arjun", "hi arjun", "hello arjun", "arjun",
    "can you", "can u", "please", "plz",
];

/// Request verbs stripped before splitting name from role.
pub const COMMAND_PREFIXES: &[&str] = &[
    "what is the status of",
    "what's the status of",
    "whats the status of",
    "give me the status of",
    "give me status of",
    "can you evaluate",
    "please evaluate",
    "status of",
    "status for",
    "evaluate",
    "summary",
    "status",
    "review",
    "show",
    "check",
];

fn verb_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:evaluate|review|check|assess)\s+(?P<name>.+?)\s+(?:of|for)\s+(?P<role>.+)$")
            .expect("valid regex")
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips a case-insensitive `prefix` that ends on a word boundary.
pub(super) fn strip_word_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &text[prefix.len()..];
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn strip_bot_noise(text: &str) -> &str {
    let mut working = text.trim();
    'outer: loop {
        for prefix in NOISE_PREFIXES {
            if let Some(rest) = strip_word_prefix(working, prefix) {
                working = rest;
                continue 'outer;
            }
        }
        return working;
    }
}

fn clean_role_text(role_text: &str) -> String {
    let cleaned = collapse_whitespace(&role_text.to_lowercase().replace("role", ""));
    cleaned
        .trim_matches(|c: char| c == '.' || c == '-' || c.is_whitespace())
        .to_string()
}

fn exact_role(cleaned: &str, roles: &[String]) -> Option<String> {
    roles.iter().find(|r| r.to_lowercase() == cleaned).cloned()
}

fn suffix_role(cleaned: &str, roles: &[String]) -> Option<String> {
    roles
        .iter()
        .find(|r| {
            let lower = r.to_lowercase();
            cleaned.ends_with(&lower) || lower.ends_with(cleaned)
        })
        .cloned()
}

/// Maps free role text onto a configured role: exact match first, then a
/// suffix match in either direction. The word "role" is ignored.
pub fn normalize_role(role_text: &str, roles: &[String]) -> Option<String> {
    let cleaned = clean_role_text(role_text);
    if cleaned.is_empty() {
        return None;
    }
    exact_role(&cleaned, roles).or_else(|| suffix_role(&cleaned, roles))
}

/// Finds a `(candidate, role)` pair in free text such as
/// "evaluate Priya Shah for the IT Support role" or "status of Arun - IT Admin".
/// The role must resolve to a configured role.
pub fn extract_candidate_and_role(text: &str, roles: &[String]) -> Option<(String, String)> {
    let raw = text.replace(['\u{2014}', '\u{2013}'], "-").replace(['?', ','], " ");
    let raw = collapse_whitespace(&raw);
    let stripped = strip_bot_noise(&raw);

    if let Some(caps) = verb_pattern().captures(stripped) {
        let candidate = caps["name"].trim_matches(|c| c == ' ' || c == '.' || c == '-');
        if let Some(role) = normalize_role(&caps["role"], roles) {
            if !candidate.is_empty() {
                return Some((candidate.to_string(), role));
            }
        }
    }

    let fragment = COMMAND_PREFIXES
        .iter()
        .find_map(|p| strip_word_prefix(stripped, p))
        .unwrap_or(stripped);
    // ASCII lowering keeps byte offsets valid for slicing `fragment`
    let lower = fragment.to_ascii_lowercase();

    for separator in [" of ", " for ", " - "] {
        let Some(index) = lower.find(separator) else {
            continue;
        };
        let candidate = fragment[..index].trim_matches(|c| c == ' ' || c == '-' || c == ':');
        if candidate.is_empty() {
            continue;
        }
        if let Some(role) = normalize_role(&fragment[index + separator.len()..], roles) {
            return Some((candidate.to_string(), role));
        }
    }

    // No separator: the role is a trailing run of words. Exact names win over suffix matches.
    let words: Vec<&str> = fragment.split_whitespace().collect();
    let words = &words;
    let splits = move || {
        (1..words.len()).map(move |split| {
            (words[..split].join(" "), clean_role_text(&words[split..].join(" ")))
        })
    };
    if let Some(pair) = splits().find_map(|(candidate, tail)| Some((candidate, exact_role(&tail, roles)?))) {
        return Some(pair);
    }
    splits()
        .rev()
        .filter(|(_, tail)| !tail.is_empty())
        .find_map(|(candidate, tail)| Some((candidate, suffix_role(&tail, roles)?)))
}

/// Splits a structured command payload `Candidate - Role`.
/// Prefers a spaced dash so hyphenated names survive.
pub fn split_candidate_role(payload: &str) -> Option<(String, String)> {
    let payload = payload.replace(['\u{2014}', '\u{2013}'], "-");
    let (candidate, role) = payload
        .split_once(" - ")
        .or_else(|| payload.split_once('-'))?;
    let (candidate, role) = (candidate.trim(), role.trim());
    if candidate.is_empty() || role.is_empty() {
        return None;
    }
    Some((candidate.to_string(), role.to_string()))
}
