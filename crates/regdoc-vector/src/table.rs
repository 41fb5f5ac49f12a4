//! LanceDB connection and table helpers.
use std::path::Path;
use std::sync::Arc;

use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection};
use tracing::info;

use regdoc_core::error::{Error, Result};

use crate::schema::{build_chunk_schema, vector_dim};

pub(crate) fn store_err(e: impl std::fmt::Display) -> Error {
	Error::VectorStore(e.to_string())
}

pub async fn open_db(dir: &Path) -> Result<Connection> {
	std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
	connect(dir.to_string_lossy().as_ref()).execute().await.map_err(store_err)
}

/// Create an empty chunk table of dimension `dim` unless `name` exists. An
/// existing table must carry the same dimension.
pub async fn ensure_table(conn: &Connection, name: &str, dim: usize) -> Result<()> {
	let names = conn.table_names().execute().await.map_err(store_err)?;
	if names.iter().any(|n| n == name) {
		let table = conn.open_table(name).execute().await.map_err(store_err)?;
		let schema = table.schema().await.map_err(store_err)?;
		return match vector_dim(&schema) {
			Some(actual) if actual == dim => Ok(()),
			Some(actual) => Err(Error::DimensionMismatch { expected: dim, actual }),
			None => Err(Error::VectorStore(format!("table '{name}' has no vector column"))),
		};
	}
	let schema: Arc<arrow_schema::Schema> = build_chunk_schema(dim);
	// create empty table with 0 rows
	let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
	conn.create_table(name, Box::new(iter)).execute().await.map_err(store_err)?;
	info!(table = name, dim, "created vector table");
	Ok(())
}

/// SQL string literal with single quotes escaped.
pub(crate) fn sql_literal(s: &str) -> String {
	format!("'{}'", s.replace('\'', "''"))
}
