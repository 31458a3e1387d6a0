use std::collections::HashMap;

use crate::models::ScoredCandidate;

/// Default RRF damping constant.
pub const DEFAULT_RRF_K: usize = 60;

/// Merge ranked lists with Reciprocal Rank Fusion.
///
/// Each candidate at 1-based rank `r` of a list contributes `1 / (k + r)` to
/// the `rrf` score of its passage id. The first copy seen of a passage is the
/// one kept. Output is sorted by descending `rrf`; equal scores keep the order
/// of first appearance across the input lists.
///
/// A single list is returned as-is: there is nothing to fuse.
pub fn reciprocal_rank_fusion(
    mut lists: Vec<Vec<ScoredCandidate>>,
    k: usize,
) -> Vec<ScoredCandidate> {
    debug_assert!(k > 0, "rrf k must be strictly positive");

    if lists.len() <= 1 {
        return lists.pop().unwrap_or_default();
    }

    let k = k as f64;
    let mut fused: Vec<(ScoredCandidate, f64)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (rank, candidate) in list.into_iter().enumerate() {
            let contribution = 1.0 / (k + rank as f64 + 1.0);

            match position.get(candidate.id()) {
                Some(&idx) => {
                    let (kept, score) = &mut fused[idx];
                    *score += contribution;
                    kept.lexical_match |= candidate.lexical_match;
                }
                None => {
                    position.insert(candidate.id().to_string(), fused.len());
                    fused.push((candidate, contribution));
                }
            }
        }
    }

    // Stable: ties stay in first-appearance order
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    fused
        .into_iter()
        .map(|(mut candidate, rrf)| {
            candidate.rrf = Some(rrf as f32);
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Passage, Source};

    fn passage(id: &str) -> Passage {
        Passage {
            id: id.to_string(),
            text: format!("content of {id}"),
            title: "Doc".to_string(),
            page: None,
            section: None,
        }
    }

    fn make_vector_hit(id: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            passage: passage(id),
            score,
            source: Source::Vector,
            distance: Some(1.0 / score - 1.0),
            rrf: None,
            lexical_match: false,
        }
    }

    fn make_lexical_hit(id: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate::lexical(passage(id), score)
    }

    fn ids(list: &[ScoredCandidate]) -> Vec<&str> {
        list.iter().map(|c| c.id()).collect()
    }

    fn rrf_of(list: &[ScoredCandidate], id: &str) -> f32 {
        list.iter().find(|c| c.id() == id).and_then(|c| c.rrf).unwrap()
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reciprocal_rank_fusion(vec![], 60).is_empty());
        assert!(reciprocal_rank_fusion(vec![vec![], vec![]], 60).is_empty());
    }

    #[test]
    fn test_single_list_is_identity() {
        let list = vec![
            make_vector_hit("c", 0.2),
            make_vector_hit("a", 0.9),
            make_vector_hit("b", 0.5),
        ];
        let fused = reciprocal_rank_fusion(vec![list.clone()], 60);
        assert_eq!(fused, list);
    }

    #[test]
    fn test_rank_beats_raw_score() {
        let vector = vec![
            make_vector_hit("1", 0.9),
            make_vector_hit("2", 0.4),
            make_vector_hit("3", 0.2),
        ];
        let lexical = vec![make_lexical_hit("3", 5.0), make_lexical_hit("4", 3.0)];

        let fused = reciprocal_rank_fusion(vec![vector, lexical], 60);
        // 2 and 4 tie at rank 2; 2 was seen first
        assert_eq!(ids(&fused), vec!["3", "1", "2", "4"]);

        let expected_3 = 1.0 / 63.0 + 1.0 / 61.0;
        assert!((rrf_of(&fused, "3") - expected_3).abs() < 1e-6);
        assert!((rrf_of(&fused, "1") - 1.0 / 61.0).abs() < 1e-6);
        assert!(rrf_of(&fused, "3") > rrf_of(&fused, "1"));
    }

    #[test]
    fn test_first_seen_copy_is_canonical() {
        let vector = vec![make_vector_hit("x", 0.7)];
        let lexical = vec![make_lexical_hit("x", 4.0)];

        let fused = reciprocal_rank_fusion(vec![vector, lexical], 60);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].source, Source::Vector);
        assert_eq!(fused[0].score, 0.7);
    }

    #[test]
    fn test_vector_copy_remembers_lexical_match() {
        let vector = vec![make_vector_hit("x", 0.2), make_vector_hit("y", 0.1)];
        let lexical = vec![make_lexical_hit("x", 4.0)];

        let fused = reciprocal_rank_fusion(vec![vector, lexical], 60);
        let x = fused.iter().find(|c| c.id() == "x").unwrap();
        assert_eq!(x.source, Source::Vector);
        assert!(x.lexical_match);
        let y = fused.iter().find(|c| c.id() == "y").unwrap();
        assert!(!y.lexical_match);
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        // a and b both sit at rank 1 of one list
        let fused = reciprocal_rank_fusion(
            vec![vec![make_vector_hit("a", 0.5)], vec![make_lexical_hit("b", 1.0)]],
            60,
        );
        assert_eq!(ids(&fused), vec!["a", "b"]);

        let fused = reciprocal_rank_fusion(
            vec![vec![make_lexical_hit("b", 1.0)], vec![make_vector_hit("a", 0.5)]],
            60,
        );
        assert_eq!(ids(&fused), vec!["b", "a"]);
    }

    #[test]
    fn test_symmetric_scores() {
        let a = vec![make_vector_hit("1", 0.9), make_vector_hit("2", 0.5)];
        let b = vec![
            make_lexical_hit("2", 3.0),
            make_lexical_hit("3", 2.0),
            make_lexical_hit("1", 1.0),
        ];

        let ab = reciprocal_rank_fusion(vec![a.clone(), b.clone()], 60);
        let ba = reciprocal_rank_fusion(vec![b, a], 60);
        for id in ["1", "2", "3"] {
            assert_eq!(rrf_of(&ab, id), rrf_of(&ba, id));
        }
    }

    #[test]
    fn test_better_rank_never_scores_lower() {
        let other = vec![make_lexical_hit("z", 1.0), make_lexical_hit("t", 0.5)];
        let better = reciprocal_rank_fusion(
            vec![
                vec![make_vector_hit("t", 0.9), make_vector_hit("u", 0.8)],
                other.clone(),
            ],
            60,
        );
        let worse = reciprocal_rank_fusion(
            vec![
                vec![make_vector_hit("u", 0.9), make_vector_hit("t", 0.8)],
                other,
            ],
            60,
        );
        assert!(rrf_of(&better, "t") >= rrf_of(&worse, "t"));
    }

    #[test]
    fn test_larger_k_flattens_curve() {
        let lists = || {
            vec![
                vec![make_vector_hit("a", 0.9), make_vector_hit("b", 0.8)],
                vec![make_lexical_hit("c", 1.0)],
            ]
        };
        let small = reciprocal_rank_fusion(lists(), 1);
        let large = reciprocal_rank_fusion(lists(), 1000);

        let spread = |f: &[ScoredCandidate]| rrf_of(f, "a") / rrf_of(f, "b");
        assert!(spread(&small) > spread(&large));
    }
}
