//! Persistent vector store on LanceDB.
use std::path::Path;
use std::sync::{Arc, RwLock};

use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tracing::{debug, info};

use regdoc_core::error::{Error, Result};
use regdoc_core::traits::VectorStore;
use regdoc_core::types::{Chunk, ChunkMetadata, DistanceMetric, EmbeddedChunk, ScoredCandidate, SourceKind};

use crate::schema::build_chunk_schema;
use crate::table::{ensure_table, open_db, sql_literal, store_err};
use crate::IndexSpec;

const INSERT_BATCH: usize = 1000;

pub struct LanceVectorStore {
	db: Connection,
	spec: RwLock<Option<IndexSpec>>,
}

impl LanceVectorStore {
	pub async fn open(dir: &Path) -> Result<Self> {
		let db = open_db(dir).await?;
		debug!(dir = %dir.display(), "opened lancedb");
		Ok(Self { db, spec: RwLock::new(None) })
	}

	fn spec(&self) -> Result<IndexSpec> {
		self.spec
			.read()
			.map_err(store_err)?
			.clone()
			.ok_or_else(|| Error::VectorStore("index not initialised; call ensure_index first".into()))
	}

	async fn table(&self, spec: &IndexSpec) -> Result<Table> {
		self.db.open_table(&spec.name).execute().await.map_err(store_err)
	}

	fn to_record_batch(rows: &[EmbeddedChunk], dim: usize) -> Result<RecordBatch> {
		let vectors = rows.iter().map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
		RecordBatch::try_new(
			build_chunk_schema(dim),
			vec![
				Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.chunk.id.as_str()))),
				Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.chunk.doc_id.as_str()))),
				Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.chunk.doc_path.as_str()))),
				Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.chunk.ordinal as i64))),
				Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.chunk.text.as_str()))),
				Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.chunk.metadata.file_name.as_str()))),
				Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.chunk.metadata.page_label.as_str()))),
				Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim as i32)),
			],
		)
		.map_err(store_err)
	}
}

fn distance_type(metric: DistanceMetric) -> DistanceType {
	match metric {
		DistanceMetric::Cosine => DistanceType::Cosine,
		DistanceMetric::L2 => DistanceType::L2,
		DistanceMetric::Dot => DistanceType::Dot,
	}
}

/// Convert `_distance` to a similarity where higher is better.
fn similarity(metric: DistanceMetric, distance: f32) -> f32 {
	match metric {
		DistanceMetric::Cosine | DistanceMetric::Dot => 1.0 - distance,
		DistanceMetric::L2 => -distance,
	}
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| Error::VectorStore(format!("column '{name}' missing from result")))
}

fn batch_to_candidates(batch: &RecordBatch, metric: DistanceMetric, out: &mut Vec<ScoredCandidate>) -> Result<()> {
	let ids = string_col(batch, "id")?;
	let doc_ids = string_col(batch, "doc_id")?;
	let doc_paths = string_col(batch, "doc_path")?;
	let texts = string_col(batch, "text")?;
	let file_names = string_col(batch, "file_name")?;
	let page_labels = string_col(batch, "page_label")?;
	let ordinals = batch.column_by_name("ordinal").and_then(|c| c.as_any().downcast_ref::<Int64Array>());
	let distances = batch
		.column_by_name("_distance")
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| Error::VectorStore("column '_distance' missing from result".into()))?;
	for i in 0..batch.num_rows() {
		let chunk = Chunk {
			id: ids.value(i).to_string(),
			doc_id: doc_ids.value(i).to_string(),
			doc_path: doc_paths.value(i).to_string(),
			ordinal: ordinals.filter(|o| o.is_valid(i)).map_or(0, |o| o.value(i).max(0) as usize),
			text: texts.value(i).to_string(),
			metadata: ChunkMetadata { file_name: file_names.value(i).to_string(), page_label: page_labels.value(i).to_string() },
		};
		out.push(ScoredCandidate::new(chunk, similarity(metric, distances.value(i)), SourceKind::Dense));
	}
	Ok(())
}

#[async_trait]
impl VectorStore for LanceVectorStore {
	async fn ensure_index(&self, name: &str, dim: usize, metric: DistanceMetric) -> Result<()> {
		ensure_table(&self.db, name, dim).await?;
		*self.spec.write().map_err(store_err)? = Some(IndexSpec { name: name.to_string(), dim, metric });
		Ok(())
	}

	async fn upsert(&self, rows: &[EmbeddedChunk]) -> Result<usize> {
		if rows.is_empty() { return Ok(0); }
		let spec = self.spec()?;
		if let Some(bad) = rows.iter().find(|r| r.vector.len() != spec.dim) {
			return Err(Error::DimensionMismatch { expected: spec.dim, actual: bad.vector.len() });
		}
		let table = self.table(&spec).await?;
		for batch_rows in rows.chunks(INSERT_BATCH) {
			let batch = Self::to_record_batch(batch_rows, spec.dim)?;
			let schema = batch.schema();
			let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
			// id is unique: replace on match
			let mut mi = table.merge_insert(&["id"]);
			mi.when_matched_update_all(None).when_not_matched_insert_all();
			mi.execute(reader).await.map_err(store_err)?;
		}
		info!(rows = rows.len(), table = %spec.name, "upserted vectors");
		Ok(rows.len())
	}

	async fn delete_document(&self, doc_id: &str) -> Result<usize> {
		let spec = self.spec()?;
		let table = self.table(&spec).await?;
		let filter = format!("doc_id = {}", sql_literal(doc_id));
		let existing = table.count_rows(Some(filter.clone())).await.map_err(store_err)?;
		if existing == 0 { return Ok(0); }
		table.delete(&filter).await.map_err(store_err)?;
		debug!(doc_id, removed = existing, "deleted document vectors");
		Ok(existing)
	}

	async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredCandidate>> {
		let spec = self.spec()?;
		if vector.len() != spec.dim {
			return Err(Error::DimensionMismatch { expected: spec.dim, actual: vector.len() });
		}
		if top_k == 0 { return Ok(Vec::new()); }
		let table = self.table(&spec).await?;
		if table.count_rows(None).await.map_err(store_err)? == 0 { return Ok(Vec::new()); }
		let stream = table
			.vector_search(vector.to_vec())
			.map_err(store_err)?
			.distance_type(distance_type(spec.metric))
			.limit(top_k)
			.execute()
			.await
			.map_err(store_err)?;
		let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(store_err)?;
		let mut hits = Vec::with_capacity(top_k);
		for batch in &batches {
			batch_to_candidates(batch, spec.metric, &mut hits)?;
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(top_k);
		Ok(hits)
	}
}
