//! Small string helpers shared by the scrapers, the pipeline and logging.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n\f]+").unwrap());
static EXTRA_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended. Cuts always land on a char boundary, so
/// Korean or emoji-heavy model output is safe to preview.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Collapse a run of whitespace inside a text node to a single space,
/// the way a browser renders inline text.
pub fn collapse_inline_whitespace(s: &str) -> String {
    INLINE_WHITESPACE.replace_all(s, " ").into_owned()
}

/// Tidy text assembled from block-level elements: trim every line, keep
/// at most one blank line between paragraphs, trim the ends.
pub fn normalize_block_text(s: &str) -> String {
    let trimmed = s.lines().map(str::trim).join("\n");
    EXTRA_BLANK_LINES
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_string()
}

/// Split a comma-separated keyword field into trimmed, unique entries,
/// keeping the order the user typed them in.
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unique()
        .map(str::to_string)
        .collect()
}

/// `Some(trimmed)` when the input has any non-whitespace content.
pub fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}
