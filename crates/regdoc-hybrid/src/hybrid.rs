use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use regdoc_core::error::{Error, Result};
use regdoc_core::traits::Retriever;
use regdoc_core::types::ScoredCandidate;

/// Dense hits first, in their order, then lexical hits whose chunk id has not
/// been seen. The first occurrence of an id wins.
pub fn merge_candidates(dense: Vec<ScoredCandidate>, lexical: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(dense.len() + lexical.len());
    let mut merged = Vec::with_capacity(dense.len() + lexical.len());
    for c in dense.into_iter().chain(lexical) {
        if seen.insert(c.chunk.id.clone()) {
            merged.push(c);
        }
    }
    merged
}

/// Runs the dense and lexical retrievers concurrently and merges their hits.
/// A failure on either side fails the query.
pub struct HybridRetriever {
    dense: Arc<dyn Retriever>,
    lexical: Arc<dyn Retriever>,
}

impl HybridRetriever {
    pub fn new(dense: Arc<dyn Retriever>, lexical: Arc<dyn Retriever>) -> Self {
        Self { dense, lexical }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredCandidate>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let (dense, lexical) = tokio::try_join!(self.dense.retrieve(query), self.lexical.retrieve(query))?;
        let (n_dense, n_lexical) = (dense.len(), lexical.len());
        let merged = merge_candidates(dense, lexical);
        debug!(dense = n_dense, lexical = n_lexical, merged = merged.len(), "hybrid merge");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regdoc_core::types::{Chunk, ChunkMetadata, SourceKind};

    fn cand(id: &str, score: f32, source: SourceKind) -> ScoredCandidate {
        let chunk = Chunk {
            id: id.to_string(),
            doc_id: "d".into(),
            doc_path: "d".into(),
            ordinal: 0,
            text: id.to_string(),
            metadata: ChunkMetadata { file_name: "d".into(), page_label: "1".into() },
        };
        ScoredCandidate::new(chunk, score, source)
    }

    #[test]
    fn dense_first_then_lexical_only() {
        let dense = vec![cand("a", 0.9, SourceKind::Dense), cand("b", 0.8, SourceKind::Dense)];
        let lexical = vec![cand("c", 12.0, SourceKind::Lexical), cand("a", 11.0, SourceKind::Lexical), cand("d", 3.0, SourceKind::Lexical)];
        let merged = merge_candidates(dense, lexical);
        let ids: Vec<_> = merged.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(merged[0].source, SourceKind::Dense, "dense copy of a shared id is kept");
    }

    #[test]
    fn one_side_empty_passes_other_through() {
        let lexical = vec![cand("x", 1.0, SourceKind::Lexical)];
        assert_eq!(merge_candidates(Vec::new(), lexical.clone()), lexical);
        assert!(merge_candidates(Vec::new(), Vec::new()).is_empty());
    }
}
