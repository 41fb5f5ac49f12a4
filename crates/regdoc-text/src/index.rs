use std::sync::Arc;

use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, ReloadPolicy, TantivyDocument};
use tracing::{debug, info, warn};

use regdoc_core::error::{Error, Result};
use regdoc_core::traits::Retriever;
use regdoc_core::types::{Chunk, ChunkMetadata, ScoredCandidate, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

const WRITER_BUDGET: usize = 50_000_000;

/// In-memory BM25 index over one snapshot of chunks. Built once, then read-only.
pub struct LexicalIndex {
	index: Index,
	reader: IndexReader,
	fields: ChunkFields,
	len: usize,
}

fn lexical_err(e: impl std::fmt::Display) -> Error {
	Error::LexicalIndex(e.to_string())
}

impl LexicalIndex {
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		let (schema, fields) = build_schema();
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);
		let mut index_writer = index.writer(WRITER_BUDGET).map_err(lexical_err)?;
		for c in chunks {
			let doc = doc!(
				fields.id => c.id.clone(),
				fields.doc_id => c.doc_id.clone(),
				fields.doc_path => c.doc_path.clone(),
				fields.ordinal => c.ordinal as u64,
				fields.text => c.text.clone(),
				fields.file_name => c.metadata.file_name.clone(),
				fields.page_label => c.metadata.page_label.clone(),
			);
			index_writer.add_document(doc).map_err(lexical_err)?;
		}
		index_writer.commit().map_err(lexical_err)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(lexical_err)?;
		info!(chunks = chunks.len(), "built lexical index");
		Ok(Self { index, reader, fields, len: chunks.len() })
	}

	pub fn len(&self) -> usize { self.len }

	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Top `k` chunks by BM25, best first. Query syntax errors are tolerated:
	/// user text like `ktx ko?` must never fail the lexical side.
	pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredCandidate>> {
		if k == 0 || self.is_empty() { return Ok(Vec::new()); }
		let searcher = self.reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.fields.text]);
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { debug!(errors = errors.len(), "lenient lexical parse dropped query parts"); }
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k)).map_err(lexical_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(lexical_err)?;
			match self.to_chunk(&doc) {
				Some(chunk) => hits.push(ScoredCandidate::new(chunk, score, SourceKind::Lexical)),
				None => warn!("lexical hit without stored chunk fields"),
			}
		}
		Ok(hits)
	}

	fn to_chunk(&self, doc: &TantivyDocument) -> Option<Chunk> {
		let f = &self.fields;
		let text = |field: Field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);
		Some(Chunk {
			id: text(f.id)?,
			doc_id: text(f.doc_id)?,
			doc_path: text(f.doc_path).unwrap_or_default(),
			ordinal: doc.get_first(f.ordinal).and_then(|v| v.as_u64()).unwrap_or_default() as usize,
			text: text(f.text)?,
			metadata: ChunkMetadata { file_name: text(f.file_name)?, page_label: text(f.page_label).unwrap_or_default() },
		})
	}
}

/// Sparse half of the hybrid retriever.
pub struct LexicalRetriever {
	index: Arc<LexicalIndex>,
	top_k: usize,
}

impl LexicalRetriever {
	pub fn new(index: Arc<LexicalIndex>, top_k: usize) -> Self { Self { index, top_k } }
}

#[async_trait]
impl Retriever for LexicalRetriever {
	async fn retrieve(&self, query: &str) -> Result<Vec<ScoredCandidate>> {
		self.index.search(query, self.top_k)
	}
}
