use std::collections::HashSet;

use crate::models::ScoredCandidate;

/// Number of leading characters that identify a passage body.
pub const TEXT_KEY_CHARS: usize = 500;

/// First `n` characters of `text`, cut on a char boundary.
pub fn text_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Drop candidates whose first 500 characters repeat an earlier candidate.
///
/// The first occurrence wins regardless of source or score; survivors keep
/// their relative order.
pub fn dedupe_by_text(candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(text_prefix(c.text(), TEXT_KEY_CHARS).to_string()))
        .collect()
}
