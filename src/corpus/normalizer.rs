//! Narrative text normalization.
//!
//! Canonical policy: lowercase, keep `[a-z0-9]`, whitespace and the
//! sentence punctuation `. , ? !`, drop CFPB redaction masks (`XXXX`),
//! collapse whitespace. Disallowed characters are stripped *before* masks
//! are removed so a second pass never finds a freshly formed `xx` run.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s.,?!]").expect("valid disallowed-char regex"));

static REDACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"x{2,}").expect("valid redaction regex"));

/// Clean a complaint narrative.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, "");
    let unredacted = REDACTION.replace_all(&stripped, "");
    unredacted.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a possibly absent narrative; absent text becomes an empty string.
pub fn clean_optional(text: Option<&str>) -> String {
    text.map(clean_text).unwrap_or_default()
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
