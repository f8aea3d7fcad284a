// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cosine similarity and threshold-gated top-k selection.

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths, empty input, or a zero-norm vector, so
/// a missing or degenerate embedding never passes a positive threshold.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    dot / denom
}

/// A candidate scored against a query.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub item: T,
    pub similarity: f32,
    /// Larger means more recent; breaks similarity ties.
    pub recency: usize,
}

/// Keep candidates strictly above `threshold`, order by similarity then
/// recency (both descending), and return at most `max_k`.
pub fn top_k_above<T>(mut scored: Vec<Scored<T>>, threshold: f32, max_k: usize) -> Vec<Scored<T>> {
    scored.retain(|s| s.similarity > threshold);
    scored.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then(b.recency.cmp(&a.recency))
    });
    scored.truncate(max_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_are_negative() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn ties_prefer_recent_candidates() {
        let scored = vec![
            Scored { item: "old", similarity: 0.9, recency: 0 },
            Scored { item: "new", similarity: 0.9, recency: 1 },
            Scored { item: "best", similarity: 0.95, recency: 0 },
        ];
        let top: Vec<_> = top_k_above(scored, 0.75, 2).into_iter().map(|s| s.item).collect();
        assert_eq!(top, vec!["best", "new"]);
    }

    #[test]
    fn threshold_is_strict() {
        let scored = vec![Scored { item: 1, similarity: 0.75, recency: 0 }];
        assert!(top_k_above(scored, 0.75, 2).is_empty());
    }

    proptest! {
        #[test]
        fn similarity_is_bounded_and_symmetric(
            a in proptest::collection::vec(-100.0f32..100.0, 1..16),
            b in proptest::collection::vec(-100.0f32..100.0, 1..16),
        ) {
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-4);
            prop_assert!((-1.0001..=1.0001).contains(&ab));
        }

        #[test]
        fn top_k_respects_bounds(
            sims in proptest::collection::vec(-1.0f32..1.0, 0..20),
            threshold in 0.0f32..1.0,
            max_k in 1usize..5,
        ) {
            let scored = sims
                .iter()
                .enumerate()
                .map(|(i, s)| Scored { item: i, similarity: *s, recency: i })
                .collect();
            let top = top_k_above(scored, threshold, max_k);
            prop_assert!(top.len() <= max_k);
            prop_assert!(top.iter().all(|s| s.similarity > threshold));
            prop_assert!(top.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        }
    }
}
