//! Redaction of sensitive values in logs and admin responses.
//!
//! A field is sensitive when its name matches the fixed pattern list:
//! `*api_key*`, `*token*`, `*password*`, `*secret*` (case-insensitive).
//! Raw secrets never appear in log records, error messages, or the prompt
//! log.

/// Placeholder written in place of a sensitive value.
pub const REDACTED: &str = "***";

const SENSITIVE_MARKERS: &[&str] = &["api_key", "token", "password", "secret"];

/// Returns true when `name` matches the sensitive-name pattern list.
pub fn is_sensitive_key(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Returns the value to log for a named field: the value itself, or the
/// redaction placeholder when the name is sensitive.
pub fn field_value<'a>(name: &str, value: &'a str) -> &'a str {
    if is_sensitive_key(name) {
        REDACTED
    } else {
        value
    }
}

/// Masks a secret for display, keeping the last four characters so an
/// operator can tell keys apart. Short secrets are fully masked.
pub fn mask_secret(value: &str) -> String {
    if value.len() <= 4 {
        return REDACTED.to_string();
    }
    let tail: String = value.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{}{}", REDACTED, tail)
}
