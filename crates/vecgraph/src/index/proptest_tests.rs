//! Property-based tests for index construction, search and persistence.

#![allow(clippy::expect_used, clippy::float_cmp, clippy::cast_possible_truncation)]

use std::collections::HashSet;

use proptest::prelude::*;

use super::persistence::{decode_elements, decode_graph};
use super::{AnnIndex, IndexConfig};
use crate::types::VectorId;

/// Strategy for a set of same-dimension vectors with finite components.
fn arb_vectors(max_len: usize) -> impl Strategy<Value = Vec<Vec<f32>>> {
    (1usize..6).prop_flat_map(move |dim| {
        prop::collection::vec(prop::collection::vec(-1000.0f32..1000.0, dim), 1..max_len)
    })
}

/// Vectors plus a query of the same dimension.
fn arb_vectors_and_query() -> impl Strategy<Value = (Vec<Vec<f32>>, Vec<f32>)> {
    arb_vectors(60).prop_flat_map(|vectors| {
        let dim = vectors[0].len();
        (Just(vectors), prop::collection::vec(-1000.0f32..1000.0, dim))
    })
}

fn built(vectors: &[Vec<f32>], max_degree: usize) -> AnnIndex {
    let index = AnnIndex::with_config(IndexConfig::new(max_degree).with_ef_construction(24))
        .expect("valid config");
    index.add_batch(vectors).expect("add batch should succeed");
    index.build().expect("build should succeed");
    index
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn add_then_get_returns_vector(vectors in arb_vectors(40)) {
        let index = AnnIndex::new();
        for v in &vectors {
            let id = index.add(v).expect("add should succeed");
            prop_assert_eq!(index.get(id).expect("get should succeed"), v.clone());
        }
        prop_assert_eq!(index.len().expect("len"), vectors.len());
    }

    #[test]
    fn degree_bound_holds_after_build(vectors in arb_vectors(60), max_degree in 2usize..8) {
        let index = built(&vectors, max_degree);
        for i in 0..vectors.len() {
            let id = VectorId::new(i as u32);
            let neighbors = index.neighbors(id).expect("neighbors");
            prop_assert!(neighbors.len() <= max_degree);

            let unique: HashSet<_> = neighbors.iter().collect();
            prop_assert_eq!(unique.len(), neighbors.len());
            prop_assert!(!neighbors.contains(&id));
        }
    }

    #[test]
    fn search_is_sorted_unique_and_bounded(
        (vectors, query) in arb_vectors_and_query(),
        k in 1usize..20,
    ) {
        let index = built(&vectors, 6);
        let results = index.search(&query, k).expect("search should succeed");

        prop_assert!(results.len() <= k);
        prop_assert!(results.len() <= vectors.len());
        for pair in results.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
        }
        let ids: HashSet<_> = results.iter().map(|r| r.id).collect();
        prop_assert_eq!(ids.len(), results.len());
    }

    #[test]
    fn save_load_roundtrip(vectors in arb_vectors(50), max_degree in 2usize..8) {
        let index = built(&vectors, max_degree);
        let (elements, graph) = index.save().expect("save should succeed");
        let loaded = AnnIndex::load(&elements, &graph).expect("load should succeed");

        prop_assert_eq!(loaded.len().expect("len"), vectors.len());
        for i in 0..vectors.len() {
            let id = VectorId::new(i as u32);
            prop_assert_eq!(loaded.get(id).expect("get"), index.get(id).expect("get"));
            prop_assert_eq!(loaded.neighbors(id).expect("n"), index.neighbors(id).expect("n"));
        }
    }

    #[test]
    fn decoding_arbitrary_bytes_never_panics(
        elements in prop::collection::vec(any::<u8>(), 0..128),
        graph in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        if let Ok(store) = decode_elements(&elements) {
            let _ = decode_graph(&graph, &store);
        }
        let _ = AnnIndex::load(&elements, &graph);
    }

    #[test]
    fn truncated_streams_are_rejected(
        vectors in arb_vectors(20),
        cut in any::<prop::sample::Index>(),
    ) {
        let index = built(&vectors, 4);
        let (elements, graph) = index.save().expect("save should succeed");

        let at = cut.index(elements.len());
        prop_assert!(AnnIndex::load(&elements[..at], &graph).is_err());
        let at = cut.index(graph.len());
        prop_assert!(AnnIndex::load(&elements, &graph[..at]).is_err());
    }
}
