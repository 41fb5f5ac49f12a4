//! Candle BERT sentence embedder (all-MiniLM-L6-v2 and friends).
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use regdoc_core::config::EmbeddingSettings;
use regdoc_core::error::{Error, Result};
use regdoc_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::{batch_to_tensors, load_tokenizer};

const BERT_PAD_ID: u32 = 0;
const MAX_BATCH_SIZE: usize = 32;

fn embed_err(e: impl std::fmt::Display) -> Error {
    Error::Embedding(e.to_string())
}

pub struct CandleEmbedder {
    id: String,
    dim: usize,
    max_len: usize,
    model: BertModel,
    tokenizer: Mutex<Tokenizer>,
    device: Device,
}

impl CandleEmbedder {
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let model_dir = settings.model_dir.as_path();
        if !model_dir.is_dir() {
            return Err(Error::Config(format!("embedding model directory not found: {}", model_dir.display())));
        }
        info!(model = %settings.model_id, dir = %model_dir.display(), "loading embedding model");
        let config: BertConfig = read_config(model_dir)?;
        if config.hidden_size != settings.dimension {
            return Err(Error::DimensionMismatch { expected: settings.dimension, actual: config.hidden_size });
        }
        let max_len = settings.max_len.min(config.max_position_embeddings);
        let tokenizer = load_tokenizer(model_dir, max_len, Error::Embedding)?;
        let device = select_device();
        let vb = weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config).map_err(embed_err)?;
        info!(dim = config.hidden_size, max_len, "embedding model loaded");
        Ok(Self {
            id: format!("candle:{}:d{}", settings.model_id, config.hidden_size),
            dim: config.hidden_size,
            max_len,
            model,
            tokenizer: Mutex::new(tokenizer),
            device,
        })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = {
            let tokenizer = self.tokenizer.lock().map_err(embed_err)?;
            tokenizer.encode_batch(texts.to_vec(), true).map_err(embed_err)?
        };
        let batch = batch_to_tensors(&encodings, BERT_PAD_ID, &self.device).map_err(embed_err)?;
        let hidden = self
            .model
            .forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))
            .map_err(embed_err)?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask).map_err(embed_err)?;
        let rows: Vec<Vec<f32>> = pooled.to_dtype(DType::F32).and_then(|t| t.to_vec2()).map_err(embed_err)?;
        if let Some(bad) = rows.iter().find(|r| r.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: bad.len() });
        }
        Ok(rows)
    }
}

impl Embedder for CandleEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH_SIZE) {
            out.extend(self.embed_chunk(chunk)?);
        }
        let elapsed = start.elapsed();
        debug!(count = texts.len(), ?elapsed, "embedded batch");
        if texts.len() == 1 && elapsed.as_millis() > 500 { warn!(?elapsed, "slow single-text embedding"); }
        Ok(out)
    }
}

pub(crate) fn read_config<T: serde::de::DeserializeOwned>(model_dir: &Path) -> Result<T> {
    let path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    serde_json::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

/// `model.safetensors` when present, otherwise a PyTorch `pytorch_model.bin`.
pub(crate) fn weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.is_file() {
        // SAFETY: the weights file is not modified while the model is alive.
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device) }
            .map_err(|e| Error::Config(format!("failed to load weights: {e}")));
    }
    let pth = model_dir.join("pytorch_model.bin");
    if pth.is_file() {
        return VarBuilder::from_pth(&pth, DType::F32, device).map_err(|e| Error::Config(format!("failed to load weights: {e}")));
    }
    Err(Error::Config(format!("no model.safetensors or pytorch_model.bin in {}", model_dir.display())))
}
