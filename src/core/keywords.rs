//! Keyword extraction for knowledge entries.

use std::collections::BTreeSet;

/// Words dropped from every keyword set.
pub const STOP_WORDS: &[&str] = &["is", "a", "the", "what", "how", "for", "of"];

/// Derive the normalized keyword set for a question.
///
/// The text is lower-cased, every character outside `[a-z0-9]` and whitespace
/// is removed, and the remainder is split on whitespace. Stop words and empty
/// tokens are dropped; duplicates collapse.
pub fn extract_keywords(question: &str) -> BTreeSet<String> {
    let normalized: String = question
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    normalized
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}
