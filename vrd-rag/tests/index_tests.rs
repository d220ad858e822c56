//! Tests for the inner-product similarity index.

use proptest::prelude::*;
use vrd_rag::{Hit, RagError, SimilarityIndex, normalize};

fn unit(v: &[f32]) -> Vec<f32> {
    let mut v = v.to_vec();
    normalize(&mut v);
    v
}

#[test]
fn search_beyond_len_returns_everything_sorted() {
    let index = SimilarityIndex::build(vec![
        unit(&[1.0, 0.0]),
        unit(&[0.0, 1.0]),
        unit(&[1.0, 1.0]),
        unit(&[-1.0, 0.0]),
        unit(&[1.0, 0.2]),
    ])
    .unwrap();

    let hits = index.search(&unit(&[1.0, 0.0]), 10).unwrap();
    assert_eq!(hits.len(), 5);
    assert_eq!(hits.iter().map(|h| h.position).collect::<Vec<_>>(), [0, 4, 2, 1, 3]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn search_truncates_to_k() {
    let index =
        SimilarityIndex::build(vec![unit(&[1.0, 0.0]), unit(&[0.0, 1.0]), unit(&[1.0, 1.0])])
            .unwrap();
    let hits = index.search(&unit(&[0.0, 1.0]), 2).unwrap();
    assert_eq!(hits.iter().map(|h| h.position).collect::<Vec<_>>(), [1, 2]);
}

#[test]
fn ties_keep_position_order() {
    let v = unit(&[0.6, 0.8]);
    let index = SimilarityIndex::build(vec![v.clone(), unit(&[1.0, 0.0]), v.clone(), v]).unwrap();
    let hits = index.search(&unit(&[0.6, 0.8]), 3).unwrap();
    assert_eq!(hits.iter().map(|h| h.position).collect::<Vec<_>>(), [0, 2, 3]);
}

#[test]
fn zero_scores_tie_regardless_of_sign() {
    let index = SimilarityIndex::build(vec![unit(&[-1.0, -1.0]), unit(&[1.0, 1.0])]).unwrap();
    let hits = index.search(&[0.0, 0.0], 2).unwrap();
    assert_eq!(hits.iter().map(|h| h.position).collect::<Vec<_>>(), [0, 1]);
    assert!(hits.iter().all(|h| h.score == 0.0 && h.score.is_sign_positive()));
}

#[test]
fn empty_index_returns_nothing() {
    let index = SimilarityIndex::build(Vec::new()).unwrap();
    assert!(index.is_empty());
    assert_eq!(index.search(&[1.0, 0.0], 3).unwrap(), Vec::<Hit>::new());
}

#[test]
fn mixed_dimensions_are_rejected() {
    let err = SimilarityIndex::build(vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]).unwrap_err();
    assert!(matches!(err, RagError::IndexError(_)));
}

#[test]
fn query_dimension_mismatch_is_rejected() {
    let index = SimilarityIndex::build(vec![vec![1.0, 0.0]]).unwrap();
    assert!(matches!(index.search(&[1.0, 0.0, 0.0], 1), Err(RagError::IndexError(_))));
}

#[test]
fn normalize_leaves_zero_vectors_alone() {
    let mut zero = vec![0.0f32; 3];
    normalize(&mut zero);
    assert_eq!(zero, [0.0, 0.0, 0.0]);

    let mut v = vec![3.0f32, 4.0];
    normalize(&mut v);
    assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
}

/// Generate a non-zero L2-normalized vector of the given dimension.
fn arb_unit_vector(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero vector", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-6 {
            return None;
        }
        normalize(&mut v);
        Some(v)
    })
}

/// *For any* set of unit vectors, searching with `k >= len` returns every
/// position exactly once with non-increasing scores, and smaller `k`
/// returns a prefix of that ranking.
mod prop_index_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn full_search_is_a_sorted_permutation(
            vectors in proptest::collection::vec(arb_unit_vector(DIM), 1..30),
            query in arb_unit_vector(DIM),
            extra in 0usize..10,
        ) {
            let count = vectors.len();
            let index = SimilarityIndex::build(vectors).unwrap();
            let hits = index.search(&query, count + extra).unwrap();

            prop_assert_eq!(hits.len(), count);
            let mut positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
            positions.sort_unstable();
            prop_assert_eq!(positions, (0..count).collect::<Vec<_>>());
            for w in hits.windows(2) {
                prop_assert!(w[0].score >= w[1].score, "{} < {}", w[0].score, w[1].score);
            }
        }

        #[test]
        fn top_k_is_prefix_of_full_ranking(
            vectors in proptest::collection::vec(arb_unit_vector(DIM), 1..30),
            query in arb_unit_vector(DIM),
            k in 1usize..30,
        ) {
            let count = vectors.len();
            let index = SimilarityIndex::build(vectors).unwrap();
            let full = index.search(&query, count).unwrap();
            let top = index.search(&query, k).unwrap();

            prop_assert_eq!(top.len(), k.min(count));
            prop_assert_eq!(&top[..], &full[..top.len()]);
        }
    }
}
