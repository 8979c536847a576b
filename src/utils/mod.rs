//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use regex::Regex;
use std::sync::OnceLock;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Normalize optional text, mapping blank values to `None`
pub fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(normalize_whitespace).filter(|s| !s.is_empty())
}

/// Check whether a URL begins with a lowercase `http://` or `https://` scheme.
/// The rest of the URL is stored as the provider sent it.
pub fn is_http_url(candidate: &str) -> bool {
    let candidate = candidate.trim();
    candidate.starts_with("http://") || candidate.starts_with("https://")
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Escape `%`, `_` and `\` so a keyword matches literally inside a `LIKE` pattern
pub fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
