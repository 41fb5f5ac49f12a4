use std::sync::Arc;

use tracing::debug;

use regdoc_core::error::{Error, Result};
use regdoc_core::traits::CrossEncoder;
use regdoc_core::types::{ScoredCandidate, SourceKind};

/// Cross-encoder rerank stage: scores every candidate against the query and
/// keeps the best `top_n`.
pub struct Reranker {
    model: Arc<dyn CrossEncoder>,
    top_n: usize,
}

impl Reranker {
    pub fn new(model: Arc<dyn CrossEncoder>, top_n: usize) -> Self {
        Self { model, top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub async fn rerank(&self, query: &str, candidates: Vec<ScoredCandidate>) -> Result<Vec<ScoredCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let texts: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();
        let scores = tokio::task::spawn_blocking(move || model.score_pairs(&query, &texts))
            .await
            .map_err(|e| Error::Rerank(format!("rerank task failed: {e}")))??;
        let out = apply_scores(candidates, &scores, self.top_n)?;
        debug!(kept = out.len(), top = out.first().map(|c| c.score), "reranked");
        Ok(out)
    }
}

/// Attach `scores` to `candidates`, stable-sort descending and keep `top_n`.
/// Equal scores keep their input order; NaN ranks last.
pub fn apply_scores(candidates: Vec<ScoredCandidate>, scores: &[f32], top_n: usize) -> Result<Vec<ScoredCandidate>> {
    if scores.len() != candidates.len() {
        return Err(Error::Rerank(format!("model returned {} scores for {} candidates", scores.len(), candidates.len())));
    }
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .zip(scores)
        .map(|(c, &s)| ScoredCandidate::new(c.chunk, if s.is_nan() { f32::NEG_INFINITY } else { s }, SourceKind::Reranked))
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_n);
    Ok(scored)
}
