use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use regdoc_core::error::{Error, Result};
use regdoc_core::traits::{Embedder, Retriever, VectorStore};
use regdoc_core::types::ScoredCandidate;

/// Embed `texts` on the blocking pool; model inference must not stall the runtime.
pub async fn embed_blocking(embedder: &Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    let embedder = Arc::clone(embedder);
    tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
        .await
        .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
}

/// Dense half of the hybrid retriever: embeds the query and asks the vector store.
pub struct DenseRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl DenseRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self { embedder, store, top_k }
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredCandidate>> {
        let mut vectors = embed_blocking(&self.embedder, vec![query.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| Error::Embedding("no vector returned for query".into()))?;
        let hits = self.store.query(&vector, self.top_k).await?;
        debug!(hits = hits.len(), "dense retrieval");
        Ok(hits)
    }
}
