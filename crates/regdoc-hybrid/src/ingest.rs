//! Incremental ingestion of the data directory into the dense store.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use regdoc_core::chunker::{content_hash, list_source_files, Chunker, DocumentLoader};
use regdoc_core::error::{Error, Result};
use regdoc_core::registry::{FileStatus, Registry};
use regdoc_core::traits::{Embedder, VectorStore};
use regdoc_core::types::{Chunk, EmbeddedChunk};

use crate::dense::embed_blocking;

const EMBED_BATCH: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub file: PathBuf,
    pub error: String,
}

/// Outcome of one ingestion run, by file name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub new: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub failures: Vec<IngestFailure>,
    pub chunks_upserted: usize,
    pub chunks_deleted: usize,
    pub registry_saved: bool,
}

impl IngestReport {
    pub fn is_up_to_date(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty()
    }
}

/// Load and chunk every supported file in `data_dir`. Files that cannot be
/// read or parsed are returned as failures alongside the chunks.
pub fn load_corpus(data_dir: &Path, chunker: &Chunker) -> Result<(Vec<Chunk>, Vec<IngestFailure>)> {
    let mut chunks = Vec::new();
    let mut failures = Vec::new();
    for path in list_source_files(data_dir)? {
        match DocumentLoader::load(&path) {
            Ok(doc) => chunks.extend(chunker.chunk(&doc)),
            Err(e) if e.is_content() => failures.push(IngestFailure { file: path, error: e.to_string() }),
            Err(e) => return Err(e),
        }
    }
    info!(chunks = chunks.len(), skipped = failures.len(), "loaded corpus snapshot");
    Ok((chunks, failures))
}

pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    registry_path: PathBuf,
    show_progress: bool,
}

impl Ingestor {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, registry_path: PathBuf) -> Self {
        Self { chunker, embedder, store, registry_path, show_progress: false }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Ingest new and modified files. Content errors are recorded per file;
    /// an upstream error stops the run after saving the files already done.
    pub async fn run(&self, data_dir: &Path) -> Result<IngestReport> {
        let files = list_source_files(data_dir)?;
        let mut registry = Registry::load(&self.registry_path)?;
        let mut report = IngestReport::default();
        let pb = self.progress_bar(files.len());

        let mut outcome = Ok(());
        for path in &files {
            pb.set_message(path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
            match self.ingest_file(path, &mut registry, &mut report).await {
                Ok(()) => {}
                Err(e) if e.is_content() => {
                    warn!(file = %path.display(), error = %e, "skipping file");
                    report.failures.push(IngestFailure { file: path.clone(), error: e.to_string() });
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if !report.is_up_to_date() {
            registry.save(&self.registry_path)?;
            report.registry_saved = true;
        }
        outcome?;
        if report.is_up_to_date() {
            info!(files = files.len(), "system is up-to-date");
        } else {
            info!(new = report.new.len(), modified = report.modified.len(), chunks = report.chunks_upserted, "ingestion finished");
        }
        Ok(report)
    }

    async fn ingest_file(&self, path: &Path, registry: &mut Registry, report: &mut IngestReport) -> Result<()> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let hash = content_hash(&bytes);
        let doc = DocumentLoader::from_bytes(path, &bytes)?;
        let status = registry.status(&doc.id, &hash);
        if status == FileStatus::Unchanged {
            debug!(file = %doc.id, "unchanged");
            report.unchanged.push(doc.id);
            return Ok(());
        }

        let chunks = self.chunker.chunk(&doc);
        let mut rows = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embed_blocking(&self.embedder, texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!("{} vectors for {} chunks", vectors.len(), batch.len())));
            }
            rows.extend(batch.iter().cloned().zip(vectors).map(|(chunk, vector)| EmbeddedChunk { chunk, vector }));
        }

        report.chunks_deleted += self.store.delete_document(&doc.id).await?;
        report.chunks_upserted += self.store.upsert(&rows).await?;
        registry.record(doc.id.clone(), hash);
        info!(file = %doc.id, ?status, chunks = rows.len(), "ingested");
        match status {
            FileStatus::New => report.new.push(doc.id),
            _ => report.modified.push(doc.id),
        }
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}") {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
