//! regdoc-hybrid
//!
//! The question-answering path (query rewrite, dense + lexical retrieval,
//! cross-encoder rerank, grounded synthesis) and incremental ingestion.

pub mod dense;
pub mod hybrid;
pub mod ingest;
pub mod pipeline;
pub mod rerank;
pub mod rewrite;
pub mod synth;

pub use dense::DenseRetriever;
pub use hybrid::{merge_candidates, HybridRetriever};
pub use ingest::{load_corpus, IngestFailure, IngestReport, Ingestor};
pub use pipeline::{QaPipeline, QaResponse};
pub use rerank::Reranker;
pub use rewrite::QueryRewriter;
pub use synth::AnswerSynthesizer;
pub use regdoc_text::{LexicalIndex, LexicalRetriever};
