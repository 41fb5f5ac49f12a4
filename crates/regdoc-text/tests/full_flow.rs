use std::path::Path;
use std::sync::Arc;

use regdoc_core::chunker::{Chunker, DocumentLoader};
use regdoc_core::config::ChunkingSettings;
use regdoc_core::traits::Retriever;
use regdoc_text::{LexicalIndex, LexicalRetriever};

fn corpus() -> Vec<regdoc_core::types::Chunk> {
    let docs = [
        ("ky_tuc_xa.txt", "Sinh viên vi phạm nội quy ký túc xá bị chấm dứt hợp đồng ký túc xá. Sinh viên nợ học phí không được gia hạn hợp đồng."),
        ("hoc_vu.txt", "Sinh viên bị cảnh báo học tập khi điểm trung bình học kỳ dưới 1,0. Sinh viên bị buộc thôi học sau ba lần cảnh báo."),
        ("tot_nghiep.txt", "Điều kiện xét tốt nghiệp: tích lũy đủ số tín chỉ và chuẩn đầu ra ngoại ngữ."),
    ];
    let chunker = Chunker::new(ChunkingSettings::default()).expect("chunker");
    docs.iter()
        .map(|(name, text)| DocumentLoader::from_bytes(Path::new(name), text.as_bytes()).expect("doc"))
        .flat_map(|d| chunker.chunk(&d))
        .collect()
}

#[test]
fn bm25_ranks_matching_document_first() {
    let index = LexicalIndex::build(&corpus()).expect("index");
    let hits = index.search("chấm dứt hợp đồng ký túc xá", 10).expect("search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk.metadata.file_name, "ky_tuc_xa.txt");
    for pair in hits.windows(2) { assert!(pair[0].score >= pair[1].score); }
}

#[test]
fn diacritic_free_query_matches() {
    let index = LexicalIndex::build(&corpus()).expect("index");
    let hits = index.search("ky tuc xa", 10).expect("search");
    assert_eq!(hits.first().map(|h| h.chunk.metadata.file_name.as_str()), Some("ky_tuc_xa.txt"));
}

#[test]
fn query_syntax_characters_do_not_fail() {
    let index = LexicalIndex::build(&corpus()).expect("index");
    for q in ["Rớt môn có bị đuổi khỏi ktx ko?", "điều kiện: \"tốt nghiệp", "(((", "AND OR"] {
        index.search(q, 10).expect("lenient parse never errors");
    }
}

#[tokio::test]
async fn retriever_honours_top_k() {
    let index = Arc::new(LexicalIndex::build(&corpus()).expect("index"));
    let retriever = LexicalRetriever::new(index, 1);
    let hits = retriever.retrieve("sinh viên").await.expect("retrieve");
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn unrelated_query_returns_empty() {
    let index = Arc::new(LexicalIndex::build(&corpus()).expect("index"));
    let retriever = LexicalRetriever::new(index, 10);
    assert!(retriever.retrieve("weather forecast").await.expect("retrieve").is_empty());
}
