use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "regdoc_text";

/// Handles to every field of the chunk schema.
#[derive(Debug, Clone, Copy)]
pub struct ChunkFields {
	pub id: Field,
	pub doc_id: Field,
	pub doc_path: Field,
	pub ordinal: Field,
	pub text: Field,
	pub file_name: Field,
	pub page_label: Field,
}

pub fn build_schema() -> (Schema, ChunkFields) {
	let mut schema_builder = Schema::builder();
	let id = schema_builder.add_text_field("id", STRING | STORED);
	let doc_id = schema_builder.add_text_field("doc_id", STRING | STORED);
	let doc_path = schema_builder.add_text_field("doc_path", STORED);
	let ordinal = schema_builder.add_u64_field("ordinal", STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	let text = schema_builder.add_text_field("text", text_options);
	let file_name = schema_builder.add_text_field("file_name", STRING | STORED);
	let page_label = schema_builder.add_text_field("page_label", STRING | STORED);
	(schema_builder.build(), ChunkFields { id, doc_id, doc_path, ordinal, text, file_name, page_label })
}

/// Lowercase, drop stop words, then fold diacritics so that "ktx ký túc xá"
/// and "ky tuc xa" hit the same terms.
pub fn register_tokenizer(index: &Index) {
	let stop_words = [
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
		"và","của","là","các","những","được","cho","trong","với","thì","mà","này","đó",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(64))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.iter().map(|s| s.to_string())))
		.filter(AsciiFoldingFilter)
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
