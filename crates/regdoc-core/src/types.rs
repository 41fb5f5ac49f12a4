//! Domain types shared by the lexical, dense and hybrid engines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub type ChunkId = String;

/// One page of a loaded source file. Plain-text sources without form feeds
/// have a single page labelled `"1"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub label: String,
    pub text: String,
}

/// A source file as read by ingestion.
///
/// - `id`: the file name, which is also the registry key
/// - `path`: where the file was read from
/// - `pages`: page-split text, in file order
/// - `content_hash`: blake3 hex digest of the raw bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub path: PathBuf,
    pub pages: Vec<Page>,
    pub content_hash: String,
}

impl Document {
    pub fn text(&self) -> String {
        self.pages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

/// Metadata inherited by every chunk from its document, surfaced in citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_name: String,
    pub page_label: String,
}

/// A contiguous span of a document's text, independently indexed by both engines.
///
/// `id` is derived from content (see [`crate::chunker::chunk_id`]), so the same
/// span gets the same id in the lexical and dense indexes and across re-ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_path: String,
    pub ordinal: usize,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Indicates which step produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Dense,
    Lexical,
    Reranked,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dense => write!(f, "dense"),
            Self::Lexical => write!(f, "lexical"),
            Self::Reranked => write!(f, "reranked"),
        }
    }
}

/// A chunk with the score assigned by one retrieval or rerank step.
///
/// Scores are only comparable between candidates with the same `source`:
/// cosine similarity, BM25 and cross-encoder logits live on different scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub score: f32,
    pub source: SourceKind,
}

impl ScoredCandidate {
    pub fn new(chunk: Chunk, score: f32, source: SourceKind) -> Self {
        Self { chunk, score, source }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// Similarity metric of a dense index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::L2 => write!(f, "l2"),
            Self::Dot => write!(f, "dot"),
        }
    }
}

/// A chunk together with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Generated answer paired with the exact candidates that were placed in the
/// prompt. Citations are never regenerated from the answer text.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<ScoredCandidate>,
}
