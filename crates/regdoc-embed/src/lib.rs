//! regdoc-embed
//!
//! Embedding and cross-encoder models behind the `Embedder` and `CrossEncoder`
//! traits. Candle-backed models are behind the default `candle` feature; the
//! hashing embedder and overlap cross-encoder are always available.

#[cfg(feature = "candle")]
pub mod device;
#[cfg(feature = "candle")]
pub mod model;
#[cfg(feature = "candle")]
pub mod pool;
#[cfg(feature = "candle")]
pub mod tokenize;

pub mod hashing;
pub mod rerank;

use std::sync::Arc;

use tracing::info;

use regdoc_core::config::{EmbeddingSettings, RerankSettings};
use regdoc_core::error::Result;
use regdoc_core::traits::{CrossEncoder, Embedder};

pub use hashing::HashEmbedder;
#[cfg(feature = "candle")]
pub use model::CandleEmbedder;
#[cfg(feature = "candle")]
pub use pool::masked_mean_l2;
#[cfg(feature = "candle")]
pub use rerank::CandleCrossEncoder;
pub use rerank::OverlapCrossEncoder;

/// Embedder selected by configuration: the hashing embedder when `fake` is
/// set, otherwise the candle model from `model_dir`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.fake {
        info!(dim = settings.dimension, "using hashing embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dimension)));
    }
    load_embedder(settings)
}

#[cfg(feature = "candle")]
fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(CandleEmbedder::load(settings)?))
}

#[cfg(not(feature = "candle"))]
fn load_embedder(_settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    Err(regdoc_core::Error::Config("built without the `candle` feature; set embedding.fake = true".into()))
}

/// Cross-encoder selected by configuration, mirroring [`get_default_embedder`].
pub fn get_default_cross_encoder(settings: &RerankSettings) -> Result<Arc<dyn CrossEncoder>> {
    if settings.fake {
        info!("using overlap cross-encoder");
        return Ok(Arc::new(OverlapCrossEncoder));
    }
    load_cross_encoder(settings)
}

#[cfg(feature = "candle")]
fn load_cross_encoder(settings: &RerankSettings) -> Result<Arc<dyn CrossEncoder>> {
    Ok(Arc::new(CandleCrossEncoder::load(settings)?))
}

#[cfg(not(feature = "candle"))]
fn load_cross_encoder(_settings: &RerankSettings) -> Result<Arc<dyn CrossEncoder>> {
    Err(regdoc_core::Error::Config("built without the `candle` feature; set rerank.fake = true".into()))
}
