//! Utility functions for string handling used across the pipeline.
//!
//! - Shortening strings for log output
//! - Hard character-limit truncation for post bodies
//! - Whitespace normalization for scraped text

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Cut `s` down to at most `limit` characters.
///
/// Returns the input untouched when it already fits. Counting is in
/// `char`s so multi-byte text is never split inside a code point.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        None => s,
        Some((cut, _)) => &s[..cut],
    }
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn squash_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}
