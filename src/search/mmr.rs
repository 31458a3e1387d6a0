//! Maximal Marginal Relevance selection.
//!
//! Greedily picks candidates that are relevant to the query but not redundant
//! with what has already been picked:
//!
//! ```text
//! mmr(c) = λ · relevance(c) − (1 − λ) · max_{s ∈ selected} redundancy(c, s)
//! ```
//!
//! Relevance is the candidate's own `score`. Redundancy is the Jaccard
//! similarity of the word sets of the first 500 characters of both passages.

use std::collections::HashSet;

use crate::models::ScoredCandidate;
use crate::search::dedupe::{text_prefix, TEXT_KEY_CHARS};

/// Word set of the leading part of a passage.
fn word_set(text: &str) -> HashSet<&str> {
    text_prefix(text, TEXT_KEY_CHARS).split_whitespace().collect()
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}

/// Symmetric textual overlap in `[0, 1]`; empty texts overlap with nothing.
pub fn text_similarity(a: &str, b: &str) -> f32 {
    jaccard(&word_set(a), &word_set(b))
}

/// Select at most `final_k` candidates balancing relevance against redundancy.
///
/// Lists no longer than `final_k` come back unchanged. Otherwise the result
/// is seeded with the highest-scoring candidate, and each following pick is the
/// remaining candidate with the best MMR score; ties go to the earliest one.
pub fn select_diverse(
    candidates: Vec<ScoredCandidate>,
    lambda: f32,
    final_k: usize,
) -> Vec<ScoredCandidate> {
    if candidates.len() <= final_k {
        return candidates;
    }
    if final_k == 0 {
        return Vec::new();
    }

    let word_sets: Vec<HashSet<&str>> = candidates.iter().map(|c| word_set(c.text())).collect();

    // Indices into `candidates`, in original order
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    // Highest redundancy of each candidate against the selected set
    let mut max_redundancy = vec![0.0f32; candidates.len()];
    let mut selected: Vec<usize> = Vec::with_capacity(final_k);

    let seed_pos = remaining
        .iter()
        .enumerate()
        .fold(0, |best, (pos, &idx)| {
            if candidates[idx].score > candidates[remaining[best]].score {
                pos
            } else {
                best
            }
        });
    selected.push(remaining.remove(seed_pos));

    while selected.len() < final_k && !remaining.is_empty() {
        let last = selected[selected.len() - 1];
        for &idx in &remaining {
            let sim = jaccard(&word_sets[idx], &word_sets[last]);
            if sim > max_redundancy[idx] {
                max_redundancy[idx] = sim;
            }
        }

        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (pos, &idx) in remaining.iter().enumerate() {
            let score =
                lambda * candidates[idx].score - (1.0 - lambda) * max_redundancy[idx];
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }
        selected.push(remaining.remove(best_pos));
    }

    drop(word_sets);
    let mut slots: Vec<Option<ScoredCandidate>> = candidates.into_iter().map(Some).collect();
    selected
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}
