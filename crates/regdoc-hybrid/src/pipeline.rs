use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use regdoc_core::config::TimeoutSettings;
use regdoc_core::error::{Error, Result};
use regdoc_core::traits::Retriever;
use regdoc_core::types::Answer;

use crate::rerank::Reranker;
use crate::rewrite::QueryRewriter;
use crate::synth::AnswerSynthesizer;

#[derive(Debug, Clone, Serialize)]
pub struct QaResponse {
    pub original_query: String,
    pub rewritten_query: String,
    pub answer: Answer,
}

/// Run `fut` under `limit`; elapsing is a timeout of `stage`.
pub async fn bounded<T>(stage: &'static str, limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(Error::Timeout { stage, elapsed: limit }),
    }
}

/// rewrite → hybrid retrieve → rerank → synthesize. Built once, shared
/// read-only across queries.
pub struct QaPipeline {
    rewriter: QueryRewriter,
    retriever: Arc<dyn Retriever>,
    reranker: Reranker,
    synthesizer: AnswerSynthesizer,
    timeouts: TimeoutSettings,
}

impl QaPipeline {
    pub fn new(
        rewriter: QueryRewriter,
        retriever: Arc<dyn Retriever>,
        reranker: Reranker,
        synthesizer: AnswerSynthesizer,
        timeouts: TimeoutSettings,
    ) -> Self {
        Self { rewriter, retriever, reranker, synthesizer, timeouts }
    }

    pub async fn ask(&self, query: &str) -> Result<QaResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let start = Instant::now();
        let rewritten = bounded("rewrite", self.timeouts.rewrite(), self.rewriter.rewrite(query)).await?;
        let candidates = bounded("retrieve", self.timeouts.retrieve(), self.retriever.retrieve(&rewritten)).await?;
        debug!(candidates = candidates.len(), "retrieved");
        let top = bounded("rerank", self.timeouts.rerank(), self.reranker.rerank(&rewritten, candidates)).await?;
        let answer = bounded("synthesize", self.timeouts.synthesize(), self.synthesizer.synthesize(&rewritten, top)).await?;
        info!(elapsed = ?start.elapsed(), citations = answer.citations.len(), "answered");
        Ok(QaResponse { original_query: query.to_string(), rewritten_query: rewritten, answer })
    }
}
