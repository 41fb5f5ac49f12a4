use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use regdoc_core::error::{Error, Result};
use regdoc_core::traits::VectorStore;
use regdoc_core::types::{DistanceMetric, EmbeddedChunk, ScoredCandidate, SourceKind};

use crate::IndexSpec;

/// Brute-force in-process vector store. Not persistent.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Option<(IndexSpec, BTreeMap<String, EmbeddedChunk>)>>,
}

fn lock_err<T>(_: T) -> Error {
    Error::VectorStore("memory store lock poisoned".into())
}

fn not_ready() -> Error {
    Error::VectorStore("index not initialised; call ensure_index first".into())
}

fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match metric {
        DistanceMetric::Dot => dot,
        DistanceMetric::Cosine => {
            let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
        }
        DistanceMetric::L2 => -a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>(),
    }
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().ok().and_then(|g| g.as_ref().map(|(_, rows)| rows.len())).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_index(&self, name: &str, dim: usize, metric: DistanceMetric) -> Result<()> {
        let mut guard = self.inner.write().map_err(lock_err)?;
        match guard.as_ref() {
            Some((spec, _)) if spec.dim != dim => Err(Error::DimensionMismatch { expected: dim, actual: spec.dim }),
            Some(_) => Ok(()),
            None => {
                *guard = Some((IndexSpec { name: name.to_string(), dim, metric }, BTreeMap::new()));
                Ok(())
            }
        }
    }

    async fn upsert(&self, rows: &[EmbeddedChunk]) -> Result<usize> {
        let mut guard = self.inner.write().map_err(lock_err)?;
        let (spec, map) = guard.as_mut().ok_or_else(not_ready)?;
        if let Some(bad) = rows.iter().find(|r| r.vector.len() != spec.dim) {
            return Err(Error::DimensionMismatch { expected: spec.dim, actual: bad.vector.len() });
        }
        for r in rows {
            map.insert(r.chunk.id.clone(), r.clone());
        }
        Ok(rows.len())
    }

    async fn delete_document(&self, doc_id: &str) -> Result<usize> {
        let mut guard = self.inner.write().map_err(lock_err)?;
        let (_, map) = guard.as_mut().ok_or_else(not_ready)?;
        let before = map.len();
        map.retain(|_, r| r.chunk.doc_id != doc_id);
        Ok(before - map.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredCandidate>> {
        let guard = self.inner.read().map_err(lock_err)?;
        let (spec, map) = guard.as_ref().ok_or_else(not_ready)?;
        if vector.len() != spec.dim {
            return Err(Error::DimensionMismatch { expected: spec.dim, actual: vector.len() });
        }
        let mut hits: Vec<ScoredCandidate> = map
            .values()
            .map(|r| ScoredCandidate::new(r.chunk.clone(), score(spec.metric, vector, &r.vector), SourceKind::Dense))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}
