use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const VECTOR_COLUMN: &str = "vector";

/// Row layout of the chunk table: the chunk payload plus its embedding.
pub fn build_chunk_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("doc_id", DataType::Utf8, false),
		Field::new("doc_path", DataType::Utf8, false),
		Field::new("ordinal", DataType::Int64, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("file_name", DataType::Utf8, false),
		Field::new("page_label", DataType::Utf8, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}

/// Dimension of the vector column in `schema`, if it has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}
