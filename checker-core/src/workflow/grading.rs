//! The correctness predicate.

/// Reply the grammar service gives when a sentence needs no changes.
const CORRECT_SENTINEL: &str = "correct";

/// Whether `corrected` (the grammar service's reply) confirms `text`.
///
/// Both must be non-empty, and the reply must either repeat the text
/// exactly (after trimming) or be the sentinel word "correct", ignoring
/// case and any non-word characters.
pub fn is_correct(text: &str, corrected: &str) -> bool {
    let corrected = corrected.trim();
    if text.is_empty() || corrected.is_empty() {
        return false;
    }

    corrected == text || word_chars(corrected).to_lowercase() == CORRECT_SENTINEL
}

/// Keep only `[A-Za-z0-9_]`.
fn word_chars(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
