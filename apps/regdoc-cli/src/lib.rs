//! Wiring shared by the `regdoc` binary: settings in, ingestor and QA
//! pipeline out, plus plain-text rendering of answers.
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use regdoc_core::chunker::Chunker;
use regdoc_core::config::Settings;
use regdoc_core::traits::{Embedder, VectorStore};
use regdoc_embed::{get_default_cross_encoder, get_default_embedder};
use regdoc_hybrid::{
    load_corpus, AnswerSynthesizer, DenseRetriever, HybridRetriever, IngestReport, Ingestor, LexicalIndex,
    LexicalRetriever, QaPipeline, QaResponse, QueryRewriter, Reranker,
};
use regdoc_llm::ChatClient;
use regdoc_vector::LanceVectorStore;

/// Open the on-disk store and make sure the configured index exists.
pub async fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let store = LanceVectorStore::open(&settings.vector.db_dir)
        .await
        .with_context(|| format!("opening vector store at {}", settings.vector.db_dir.display()))?;
    store.ensure_index(&settings.vector.index_name, settings.embedding.dimension, settings.vector.metric).await?;
    Ok(Arc::new(store))
}

pub async fn ingest(settings: &Settings, show_progress: bool) -> Result<IngestReport> {
    let data_dir = settings.require_data_dir()?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let store = open_store(settings).await?;
    let chunker = Chunker::new(settings.chunking)?;
    let report = Ingestor::new(chunker, embedder, store, settings.data.registry_file.clone())
        .with_progress(show_progress)
        .run(data_dir)
        .await?;
    Ok(report)
}

/// Build the full QA pipeline. The lexical index is rebuilt from the data
/// directory on every start.
pub async fn build_pipeline(settings: &Settings) -> Result<QaPipeline> {
    let api_key = settings.require_api_key()?;
    let data_dir = settings.require_data_dir()?;
    let generator = Arc::new(ChatClient::new(&settings.llm, api_key, settings.timeouts.longest())?);

    let embedder: Arc<dyn Embedder> = get_default_embedder(&settings.embedding)?;
    let store = open_store(settings).await?;
    let chunker = Chunker::new(settings.chunking)?;
    let (chunks, failures) = load_corpus(data_dir, &chunker)?;
    for f in &failures {
        tracing::warn!(file = %f.file.display(), error = %f.error, "not searchable");
    }
    let lexical = Arc::new(LexicalIndex::build(&chunks)?);
    info!(chunks = lexical.len(), embedder = embedder.id(), "retrievers ready");

    let retriever = HybridRetriever::new(
        Arc::new(DenseRetriever::new(embedder, store, settings.retrieval.dense_top_k)),
        Arc::new(LexicalRetriever::new(lexical, settings.retrieval.lexical_top_k)),
    );
    let reranker = Reranker::new(get_default_cross_encoder(&settings.rerank)?, settings.rerank.top_n);
    Ok(QaPipeline::new(
        QueryRewriter::new(generator.clone()),
        Arc::new(retriever),
        reranker,
        AnswerSynthesizer::new(generator, settings.synthesis.clone()),
        settings.timeouts,
    ))
}

/// Human-readable answer with the rewritten query and numbered sources.
pub fn render_response(resp: &QaResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "AI đã hiểu ý bạn là: {}\n", resp.rewritten_query);
    let _ = writeln!(out, "{}", resp.answer.text);
    if !resp.answer.citations.is_empty() {
        out.push_str("\nNguồn tham khảo:\n");
    }
    for (i, c) in resp.answer.citations.iter().enumerate() {
        let meta = &c.chunk.metadata;
        let _ = writeln!(out, "Nguồn {}: {} (Trang {}) - Score: {:.4}", i + 1, meta.file_name, meta.page_label, c.score);
        for line in c.chunk.text.lines() {
            let _ = writeln!(out, "> {line}");
        }
    }
    out
}

pub fn render_report(report: &IngestReport) -> String {
    if report.is_up_to_date() && report.failures.is_empty() {
        return format!("System is up-to-date ({} files unchanged)", report.unchanged.len());
    }
    let mut out = String::new();
    for name in &report.new {
        let _ = writeln!(out, "+ {name}");
    }
    for name in &report.modified {
        let _ = writeln!(out, "~ {name}");
    }
    for f in &report.failures {
        let _ = writeln!(out, "! {}: {}", f.file.display(), f.error);
    }
    let _ = write!(
        out,
        "{} new, {} modified, {} unchanged, {} failed; {} chunks written, {} removed",
        report.new.len(),
        report.modified.len(),
        report.unchanged.len(),
        report.failures.len(),
        report.chunks_upserted,
        report.chunks_deleted
    );
    out
}
