#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use regdoc_core::config::{ChunkingSettings, SynthesisSettings, TimeoutSettings};
use regdoc_core::chunker::Chunker;
use regdoc_core::error::Result;
use regdoc_core::traits::{Embedder, Generator, VectorStore};
use regdoc_core::types::DistanceMetric;
use regdoc_embed::{HashEmbedder, OverlapCrossEncoder};
use regdoc_hybrid::{
    load_corpus, AnswerSynthesizer, DenseRetriever, HybridRetriever, Ingestor, LexicalIndex, LexicalRetriever, QaPipeline,
    QueryRewriter, Reranker,
};
use regdoc_vector::MemoryVectorStore;

pub const DORM_QUERY_FORMAL: &str =
    "Sinh viên nợ môn hoặc kết quả học tập kém có bị chấm dứt hợp đồng ký túc xá không?";

/// Writes three regulation files and one hidden file under `root/data`.
pub fn seed_corpus(root: &Path) -> PathBuf {
    let dir = root.join("data");
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(
        dir.join("noi_quy_ky_tuc_xa.txt"),
        "Điều 5. Chấm dứt hợp đồng ký túc xá.\nSinh viên bị buộc thôi học hoặc có kết quả học tập kém, nợ môn kéo dài sẽ bị chấm dứt hợp đồng ký túc xá.\n\x0cĐiều 6. Sinh viên phải trả phòng trong vòng 7 ngày kể từ khi hợp đồng chấm dứt.",
    )
    .expect("write");
    fs::write(
        dir.join("quy_che_hoc_vu.txt"),
        "Điều 12. Cảnh báo học tập. Sinh viên bị cảnh báo khi điểm trung bình học kỳ dưới 1,0.\nĐiều 13. Buộc thôi học sau ba lần cảnh báo liên tiếp.",
    )
    .expect("write");
    fs::write(
        dir.join("tot_nghiep.md"),
        "# Xét tốt nghiệp\nSinh viên tích lũy đủ tín chỉ và đạt chuẩn ngoại ngữ được xét tốt nghiệp.",
    )
    .expect("write");
    fs::write(dir.join(".hidden.txt"), "không được đọc").expect("write");
    dir
}

/// Deterministic stand-in for the chat model. Rewrites the slang dormitory
/// question, echoes everything else, and answers only when the context
/// mentions the dormitory contract.
pub struct ScriptedGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub deflection: String,
    pub delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self { prompts: Mutex::new(Vec::new()), deflection: SynthesisSettings::default().deflection_message, delay: None }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("lock").len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().expect("lock").last().cloned().unwrap_or_default()
    }
}

fn between<'a>(s: &'a str, start: &str, end: &str) -> &'a str {
    let from = s.find(start).map_or(0, |i| i + start.len());
    let to = s[from..].find(end).map_or(s.len(), |i| from + i);
    &s[from..to]
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if prompt.contains("Standardized question:") {
            let q = between(prompt, "Question: \"", "\"\nStandardized");
            return Ok(if q.contains("ktx") { format!("\"{DORM_QUERY_FORMAL}\"") } else { q.to_string() });
        }
        let context = between(prompt, "Document context:\n", "\n\nQuestion: ");
        if context.contains("chấm dứt hợp đồng ký túc xá") && prompt.contains("ký túc xá không?") {
            Ok("Có. Sinh viên có kết quả học tập kém hoặc nợ môn kéo dài sẽ bị chấm dứt hợp đồng ký túc xá.".to_string())
        } else {
            Ok(format!("Rất tiếc. {}", self.deflection))
        }
    }
}

pub fn chunker() -> Chunker {
    Chunker::new(ChunkingSettings::default()).expect("chunker")
}

pub async fn memory_store() -> Arc<dyn VectorStore> {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    store.ensure_index("regulations", 384, DistanceMetric::Cosine).await.expect("ensure");
    store
}

pub fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(384))
}

/// Ingest `root/data` into a fresh memory store and wire a full pipeline.
pub async fn build_pipeline(root: &Path, generator: Arc<ScriptedGenerator>, timeouts: TimeoutSettings) -> QaPipeline {
    let data_dir = root.join("data");
    let data_dir = data_dir.as_path();
    let embedder = embedder();
    let store = memory_store().await;
    Ingestor::new(chunker(), Arc::clone(&embedder), Arc::clone(&store), root.join("processed_files.json"))
        .run(data_dir)
        .await
        .expect("ingest");
    let (chunks, _) = load_corpus(data_dir, &chunker()).expect("corpus");
    let lexical = Arc::new(LexicalIndex::build(&chunks).expect("lexical"));
    let retriever = HybridRetriever::new(
        Arc::new(DenseRetriever::new(embedder, store, 10)),
        Arc::new(LexicalRetriever::new(lexical, 10)),
    );
    QaPipeline::new(
        QueryRewriter::new(generator.clone()),
        Arc::new(retriever),
        Reranker::new(Arc::new(OverlapCrossEncoder), 3),
        AnswerSynthesizer::new(generator, SynthesisSettings::default()),
        timeouts,
    )
}
