use crate::models::ScoredCandidate;

/// Result of applying the similarity threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdOutcome {
    pub kept: Vec<ScoredCandidate>,
    /// True when nothing passed and the unfiltered head was used instead.
    pub fell_back: bool,
}

/// Keep candidates scoring at least `threshold`.
///
/// In hybrid mode anything the lexical searcher returned bypasses the threshold,
/// including passages whose fused copy carries the vector score. If nothing
/// survives, the first `fallback_k` candidates of the input are returned
/// unfiltered, so the threshold is a soft gate.
pub fn apply_threshold(
    candidates: &[ScoredCandidate],
    threshold: f32,
    hybrid: bool,
    fallback_k: usize,
) -> ThresholdOutcome {
    let kept: Vec<ScoredCandidate> = candidates
        .iter()
        .filter(|c| (hybrid && c.lexical_match) || c.score >= threshold)
        .cloned()
        .collect();

    if kept.is_empty() && !candidates.is_empty() {
        tracing::warn!(
            "No candidate reached similarity threshold {threshold}; using top {} unfiltered",
            fallback_k.min(candidates.len())
        );
        return ThresholdOutcome {
            kept: candidates.iter().take(fallback_k).cloned().collect(),
            fell_back: true,
        };
    }

    ThresholdOutcome {
        kept,
        fell_back: false,
    }
}
