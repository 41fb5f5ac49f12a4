//! regdoc-vector
//!
//! Dense chunk storage behind the `VectorStore` trait: LanceDB on disk (default
//! `lancedb` feature) and a brute-force in-memory store.

pub mod memory;

#[cfg(feature = "lancedb")]
pub mod lance;
#[cfg(feature = "lancedb")]
pub mod schema;
#[cfg(feature = "lancedb")]
pub mod table;

use regdoc_core::types::DistanceMetric;

#[cfg(feature = "lancedb")]
pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;

/// Name, dimension and metric fixed when an index is ensured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dim: usize,
    pub metric: DistanceMetric,
}
