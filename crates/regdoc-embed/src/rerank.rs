//! Cross-encoder relevance models.
use std::collections::HashSet;

use regdoc_core::error::Result;
use regdoc_core::traits::CrossEncoder;

/// Fraction of query terms present in the document. No model files needed;
/// used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct OverlapCrossEncoder;

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase).collect()
}

impl CrossEncoder for OverlapCrossEncoder {
    fn model_id(&self) -> &str { "overlap" }

    fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        let q = terms(query);
        if q.is_empty() { return Ok(vec![0.0; documents.len()]); }
        Ok(documents
            .iter()
            .map(|d| {
                let d = terms(d);
                q.iter().filter(|t| d.contains(*t)).count() as f32 / q.len() as f32
            })
            .collect())
    }
}

/// Logistic squash of a single-label cross-encoder logit into [0, 1].
pub fn relevance(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

#[cfg(feature = "candle")]
pub use candle_impl::CandleCrossEncoder;

#[cfg(feature = "candle")]
mod candle_impl {
    use std::sync::Mutex;

    use candle_core::{DType, Device};
    use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaForSequenceClassification};
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use regdoc_core::config::RerankSettings;
    use regdoc_core::error::{Error, Result};
    use regdoc_core::traits::CrossEncoder;

    use crate::device::select_device;
    use crate::model::{read_config, weights};
    use crate::tokenize::{batch_to_tensors, load_tokenizer};

    /// Larger batches are split to bound peak memory.
    const MAX_BATCH_SIZE: usize = 8;
    const ROBERTA_PAD_ID: u32 = 1;

    fn rerank_err(e: impl std::fmt::Display) -> Error {
        Error::Rerank(e.to_string())
    }

    /// XLM-RoBERTa sequence classifier with a single relevance logit
    /// (`BAAI/bge-reranker-base`); scores are the logit through `relevance`.
    pub struct CandleCrossEncoder {
        model_id: String,
        model: XLMRobertaForSequenceClassification,
        tokenizer: Mutex<Tokenizer>,
        device: Device,
    }

    impl CandleCrossEncoder {
        pub fn load(settings: &RerankSettings) -> Result<Self> {
            let model_dir = settings.model_dir.as_path();
            if !model_dir.is_dir() {
                return Err(Error::Config(format!("rerank model directory not found: {}", model_dir.display())));
            }
            info!(model = %settings.model_id, dir = %model_dir.display(), "loading rerank model");
            let config: XLMRobertaConfig = read_config(model_dir)?;
            let tokenizer = load_tokenizer(model_dir, settings.max_len, Error::Rerank)?;
            let device = select_device();
            let vb = weights(model_dir, &device)?;
            let model = XLMRobertaForSequenceClassification::new(1, &config, vb).map_err(rerank_err)?;
            info!("rerank model loaded");
            Ok(Self { model_id: settings.model_id.clone(), model, tokenizer: Mutex::new(tokenizer), device })
        }

        fn score_chunk(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
            let pairs: Vec<(String, String)> = documents.iter().map(|d| (query.to_string(), d.clone())).collect();
            let encodings = {
                let tokenizer = self.tokenizer.lock().map_err(rerank_err)?;
                tokenizer.encode_batch(pairs, true).map_err(rerank_err)?
            };
            let batch = batch_to_tensors(&encodings, ROBERTA_PAD_ID, &self.device).map_err(rerank_err)?;
            let logits = self
                .model
                .forward(&batch.input_ids, &batch.attention_mask, &batch.token_type_ids)
                .map_err(rerank_err)?;
            let logits: Vec<f32> =
                logits.squeeze(1).and_then(|t| t.to_dtype(DType::F32)).and_then(|t| t.to_vec1()).map_err(rerank_err)?;
            Ok(logits.into_iter().map(super::relevance).collect())
        }
    }

    impl CrossEncoder for CandleCrossEncoder {
        fn model_id(&self) -> &str { &self.model_id }

        fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
            if documents.is_empty() { return Ok(Vec::new()); }
            debug!(count = documents.len(), "scoring pairs");
            let mut scores = Vec::with_capacity(documents.len());
            for chunk in documents.chunks(MAX_BATCH_SIZE) {
                scores.extend(self.score_chunk(query, chunk)?);
            }
            Ok(scores)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_scores_follow_shared_terms() {
        let docs = vec!["Ký túc xá mở cửa lúc 6 giờ".to_string(), "Học phí".to_string(), String::new()];
        let s = OverlapCrossEncoder.score_pairs("ký túc xá", &docs).expect("score");
        assert_eq!(s.len(), 3);
        assert!((s[0] - 1.0).abs() < 1e-6);
        assert_eq!(s[1], 0.0);
        assert_eq!(s[2], 0.0);
    }

    #[test]
    fn relevance_is_bounded_and_keeps_order() {
        assert!((relevance(0.0) - 0.5).abs() < 1e-6);
        let xs = [-12.0f32, -1.5, 0.3, 4.0, 30.0];
        let ys: Vec<f32> = xs.iter().copied().map(relevance).collect();
        assert!(ys.iter().all(|y| (0.0..=1.0).contains(y)));
        assert!(ys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn blank_query_scores_zero() {
        let s = OverlapCrossEncoder.score_pairs("  ?? ", &["abc".to_string()]).expect("score");
        assert_eq!(s, vec![0.0]);
    }
}
