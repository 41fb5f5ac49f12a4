use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DistanceMetric, EmbeddedChunk, ScoredCandidate};

/// Text embedding model. The same implementation (and `id`) must be used at
/// ingestion and query time.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `candle:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Returns one L2-normalised vector of length `dim()` per input text.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Cross-encoder relevance model: scores (query, text) pairs jointly.
pub trait CrossEncoder: Send + Sync {
    fn model_id(&self) -> &str;
    /// One score per document, in input order. Higher is more relevant.
    fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// Text generation model. The contract is carried entirely by the prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// The single retrieval capability. Dense, lexical and hybrid retrievers all
/// implement it; results are ordered by descending score of their own origin.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredCandidate>>;
}

/// Persistent vector store holding chunk embeddings and chunk payloads.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the index if it does not exist. Idempotent; an existing index
    /// with a different dimension is an error.
    async fn ensure_index(&self, name: &str, dim: usize, metric: DistanceMetric) -> Result<()>;
    /// Insert or replace rows keyed by chunk id. Returns the number of rows written.
    async fn upsert(&self, rows: &[EmbeddedChunk]) -> Result<usize>;
    /// Remove every chunk belonging to `doc_id`. Returns the number removed when known.
    async fn delete_document(&self, doc_id: &str) -> Result<usize>;
    /// Nearest chunks to `vector`, best first, scored as similarity (higher is better).
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredCandidate>>;
}
