//! regdoc-text
//!
//! Tantivy-based in-memory lexical index (BM25) over chunked regulations and the
//! sparse `Retriever` used by the hybrid pipeline.

pub mod tantivy_utils;
pub mod index;

pub use index::{LexicalIndex, LexicalRetriever};
