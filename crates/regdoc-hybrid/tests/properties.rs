use proptest::prelude::*;

use regdoc_core::types::{Chunk, ChunkMetadata, ScoredCandidate, SourceKind};
use regdoc_hybrid::merge_candidates;
use regdoc_hybrid::rerank::apply_scores;

fn cand(id: &str, score: f32, source: SourceKind) -> ScoredCandidate {
    ScoredCandidate::new(
        Chunk {
            id: id.to_string(),
            doc_id: "doc.txt".into(),
            doc_path: "data/doc.txt".into(),
            ordinal: 0,
            text: format!("chunk {id}"),
            metadata: ChunkMetadata { file_name: "doc.txt".into(), page_label: "1".into() },
        },
        score,
        source,
    )
}

/// Ranked id lists as a retriever returns them: unique ids, up to 10.
fn ranked_ids() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set(0u8..24, 0..=10)
        .prop_map(|set| set.into_iter().map(|n| format!("c{n}")).collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #[test]
    fn merge_dedups_and_orders(dense_ids in ranked_ids(), lexical_ids in ranked_ids()) {
        let dense: Vec<_> = dense_ids.iter().map(|id| cand(id, 0.5, SourceKind::Dense)).collect();
        let lexical: Vec<_> = lexical_ids.iter().map(|id| cand(id, 7.0, SourceKind::Lexical)).collect();
        let merged = merge_candidates(dense, lexical);
        let ids: Vec<&str> = merged.iter().map(|c| c.id()).collect();

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());
        prop_assert!(ids.len() <= dense_ids.len() + lexical_ids.len());
        let disjoint = dense_ids.iter().all(|d| !lexical_ids.contains(d));
        prop_assert_eq!(ids.len() == dense_ids.len() + lexical_ids.len(), disjoint);

        let expected_head: Vec<&str> = dense_ids.iter().map(String::as_str).collect();
        let expected_tail: Vec<&str> = lexical_ids.iter().filter(|l| !dense_ids.contains(l)).map(String::as_str).collect();
        prop_assert_eq!(&ids[..dense_ids.len()], expected_head.as_slice());
        prop_assert_eq!(&ids[dense_ids.len()..], expected_tail.as_slice());
    }

    #[test]
    fn rerank_is_sorted_and_bounded(scores in proptest::collection::vec(-4i8..4, 0..20), top_n in 1usize..6) {
        let candidates: Vec<_> = (0..scores.len()).map(|i| cand(&format!("c{i}"), 0.0, SourceKind::Dense)).collect();
        let scores: Vec<f32> = scores.into_iter().map(f32::from).collect();
        let out = apply_scores(candidates, &scores, top_n).expect("rerank");

        prop_assert_eq!(out.len(), top_n.min(scores.len()));
        for pair in out.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                let a: usize = pair[0].id()[1..].parse().expect("index");
                let b: usize = pair[1].id()[1..].parse().expect("index");
                prop_assert!(a < b, "ties keep input order");
            }
        }
        prop_assert!(out.iter().all(|c| c.source == SourceKind::Reranked));
    }
}

#[test]
fn score_count_mismatch_is_rerank_error() {
    let candidates = vec![cand("a", 0.0, SourceKind::Dense), cand("b", 0.0, SourceKind::Lexical)];
    let err = apply_scores(candidates, &[1.0], 3).unwrap_err();
    assert!(matches!(err, regdoc_core::Error::Rerank(_)));
}
