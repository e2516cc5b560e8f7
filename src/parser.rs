//! Defensive parsers for generated text
//!
//! The generative endpoints promise strict output shapes (a bare integer, a
//! dash-bullet list, a label set) but can violate them. Everything returned by
//! the service passes through here before it is trusted: violations surface as
//! [`SafetyAiError::FormatViolation`] so callers can flag or re-prompt instead
//! of crashing or silently accepting bad data.

use crate::error::{Result, SafetyAiError};
use crate::taxonomy;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FIRST_INT_RE: Regex = Regex::new(r"\d+").unwrap();
    static ref BOLD_RE: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref BULLET_PREFIX_RE: Regex = Regex::new(r"^[-•0-9. ]+").unwrap();
}

/// Extract the 0-10 risk score from a scoring reply.
///
/// The contract asks for a bare integer, but replies like `"7"` or
/// `Risk score: 7` are accepted; the first integer wins. Anything without an
/// integer, or outside [0, 10], is a contract violation.
pub fn parse_risk_score(response: &str) -> Result<u8> {
    let m = FIRST_INT_RE.find(response).ok_or_else(|| {
        SafetyAiError::FormatViolation(format!("no integer in risk score reply: {:?}", truncate(response)))
    })?;

    let score: u64 = m.as_str().parse().map_err(|_| {
        SafetyAiError::FormatViolation(format!("unparseable risk score: {:?}", m.as_str()))
    })?;

    if score > 10 {
        return Err(SafetyAiError::FormatViolation(format!(
            "risk score {} outside 0-10",
            score
        )));
    }

    Ok(score as u8)
}

/// Parse the yes/no reply of the hazard filter gate.
///
/// An empty reply means "no hazard" per the error taxonomy; any other text
/// that is not a plain yes/no is a contract violation — the gate must never
/// default on garbage.
pub fn parse_filter_reply(response: &str) -> Result<bool> {
    let normalized = response
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim_end_matches('.')
        .to_ascii_lowercase();

    match normalized.as_str() {
        "" | "no" | "false" => Ok(false),
        "yes" | "true" => Ok(true),
        other => Err(SafetyAiError::FormatViolation(format!(
            "filter gate returned neither yes nor no: {:?}",
            truncate(other)
        ))),
    }
}

/// Parse the label set returned by the classification endpoint.
///
/// Accepted shapes, in order:
/// 1. `{"labels": ["Fall Risk", ...]}` JSON object
/// 2. a bare JSON array of strings
/// 3. a single plain-text label
///
/// Every label must come from the fixed taxonomy; an out-of-vocabulary label
/// fails the whole reply. An empty set is valid and means "no hazard".
pub fn parse_labels(response: &str) -> Result<Vec<String>> {
    let trimmed = response.trim();

    let labels: Vec<String> = if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value {
            serde_json::Value::Object(map) => map
                .get("labels")
                .and_then(|l| l.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            serde_json::Value::Array(arr) => arr
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            serde_json::Value::String(s) => vec![s],
            _ => Vec::new(),
        }
    } else if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![trimmed.to_string()]
    };

    for label in &labels {
        if !taxonomy::is_known_category(label) {
            return Err(SafetyAiError::FormatViolation(format!(
                "out-of-vocabulary hazard label: {:?}",
                label
            )));
        }
    }

    Ok(labels)
}

/// Clean a bullet-list reply into bare lines.
///
/// Strips escaped newlines, wrapping quotes, `**bold**` markers, and leading
/// dash/bullet/numbering characters. Empty lines are dropped.
pub fn clean_bullet_lines(text: &str) -> Vec<String> {
    let cleaned = text
        .replace("\\n", "\n")
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string();

    cleaned
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let line = BOLD_RE.replace_all(line, "$1");
            let line = BULLET_PREFIX_RE.replace(&line, "").trim().to_string();
            if line.is_empty() {
                None
            } else {
                Some(line)
            }
        })
        .collect()
}

/// Convert `**bold**` markers to `<strong>` tags, keeping everything else.
pub fn bold_to_strong(line: &str) -> String {
    BOLD_RE.replace_all(line, "<strong>$1</strong>").to_string()
}

/// Parse the top-3 prioritized actions reply. Exactly three bullets, ranked.
pub fn parse_prioritized_actions(response: &str) -> Result<Vec<String>> {
    let lines = clean_bullet_lines(response);
    if lines.len() != 3 {
        return Err(SafetyAiError::FormatViolation(format!(
            "prioritized actions must contain exactly 3 entries, got {}",
            lines.len()
        )));
    }
    Ok(lines)
}

/// Normalize a prose explanation: single line, no wrapping quotes.
pub fn clean_explanation(text: &str) -> String {
    text.replace("\\n", " ")
        .replace('\n', " ")
        .replace('"', "")
        .replace('\'', "")
        .trim()
        .to_string()
}

fn truncate(s: &str) -> String {
    s.chars().take(80).collect()
}
