use std::hash::Hasher;

use twox_hash::XxHash64;

use regdoc_core::error::Result;
use regdoc_core::traits::Embedder;

/// Deterministic bag-of-words embedder: each lowercased token is hashed into
/// one of `dim` buckets, then the vector is L2-normalised. Shares no model
/// files, so ingestion and queries can run offline.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    id: String,
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { id: format!("hash:xxh64:d{dim}"), dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign * (0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
