//! Document loading and sentence-aware chunking with overlap.
//!
//! Token counts are whitespace-delimited words. Chunk ids are derived from the
//! chunk's content and position, so unchanged files always yield the same ids.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, Document, Page};

const PAGE_BREAK: char = '\x0c';
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Deterministic chunk identifier: blake3 over file name, page, ordinal and text.
pub fn chunk_id(file_name: &str, page_label: &str, ordinal: usize, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(file_name.as_bytes());
    hasher.update(&[0]);
    hasher.update(page_label.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(ordinal as u64).to_le_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex()[..32].to_string()
}

/// Hex blake3 digest of raw file bytes, as stored in the ingestion registry.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(e)))
}

/// Regular, non-hidden files directly under `dir`, sorted by file name.
pub fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::DataDirMissing(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::io(dir, e.into()))?;
        let hidden = entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

pub struct DocumentLoader;

impl DocumentLoader {
    pub fn load(path: &Path) -> Result<Document> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_bytes(path, &bytes)
    }

    /// Build a document from bytes already read (ingestion hashes and loads from
    /// one read). Form feeds separate pages.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Document> {
        if !is_supported(path) {
            return Err(Error::UnsupportedFile(path.to_path_buf()));
        }
        let text = match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        };
        let pages = text
            .split(PAGE_BREAK)
            .enumerate()
            .map(|(i, t)| Page { label: (i + 1).to_string(), text: t.to_string() })
            .collect();
        let id = path.file_name().map_or_else(|| path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string());
        Ok(Document { id, path: path.to_path_buf(), pages, content_hash: content_hash(bytes) })
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(settings: ChunkingSettings) -> Result<Self> {
        if settings.chunk_size == 0 || settings.chunk_overlap >= settings.chunk_size {
            return Err(Error::Config(format!(
                "invalid chunking: size={} overlap={}",
                settings.chunk_size, settings.chunk_overlap
            )));
        }
        Ok(Self { chunk_size: settings.chunk_size, chunk_overlap: settings.chunk_overlap })
    }

    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &doc.pages {
            for text in self.split_text(&page.text) {
                let ordinal = chunks.len();
                chunks.push(Chunk {
                    id: chunk_id(&doc.id, &page.label, ordinal, &text),
                    doc_id: doc.id.clone(),
                    doc_path: doc.path.to_string_lossy().to_string(),
                    ordinal,
                    text,
                    metadata: ChunkMetadata { file_name: doc.id.clone(), page_label: page.label.clone() },
                });
            }
        }
        debug!(doc = %doc.id, chunks = chunks.len(), "chunked document");
        chunks
    }

    pub fn chunk_all(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.chunk(d)).collect()
    }

    /// Greedy sentence packing: a chunk holds whole sentences up to `chunk_size`
    /// words; the next chunk restarts with trailing sentences of at most
    /// `chunk_overlap` words.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current: Vec<Vec<&str>> = Vec::new();
        let mut current_len = 0usize;

        for sentence in split_sentences(text) {
            let words: Vec<&str> = sentence.split_whitespace().collect();
            if words.is_empty() { continue; }
            if words.len() > self.chunk_size {
                if !current.is_empty() { out.push(join(&current)); current.clear(); current_len = 0; }
                out.extend(self.split_words(&words));
                continue;
            }
            if current_len + words.len() > self.chunk_size && !current.is_empty() {
                out.push(join(&current));
                let (tail, tail_len) = self.overlap_tail(&current, words.len());
                current = tail;
                current_len = tail_len;
            }
            current_len += words.len();
            current.push(words);
        }
        if !current.is_empty() { out.push(join(&current)); }
        out
    }

    /// Trailing sentences totalling at most `chunk_overlap` words that still
    /// leave room for a sentence of `incoming` words.
    fn overlap_tail<'a>(&self, sentences: &[Vec<&'a str>], incoming: usize) -> (Vec<Vec<&'a str>>, usize) {
        let budget = self.chunk_overlap.min(self.chunk_size.saturating_sub(incoming));
        let mut tail = Vec::new();
        let mut len = 0usize;
        for s in sentences.iter().rev() {
            if len + s.len() > budget { break; }
            len += s.len();
            tail.push(s.clone());
        }
        tail.reverse();
        (tail, len)
    }

    fn split_words(&self, words: &[&str]) -> Vec<String> {
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start += step;
        }
        chunks
    }
}

fn join(sentences: &[Vec<&str>]) -> String {
    sentences.iter().map(|s| s.join(" ")).collect::<Vec<_>>().join(" ")
}

/// Split on sentence terminators (kept with their sentence) and line breaks.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?' | ';' | '\n') {
            let end = i + c.len_utf8();
            let s = text[start..end].trim();
            if !s.is_empty() { out.push(s); }
            start = end;
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() { out.push(rest); }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingSettings { chunk_size: size, chunk_overlap: overlap }).expect("chunker")
    }

    fn doc(name: &str, text: &str) -> Document {
        DocumentLoader::from_bytes(Path::new(name), text.as_bytes()).expect("doc")
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunker(512, 50).chunk(&doc("a.txt", "Sinh viên ở ký túc xá. Phải đóng phí."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Sinh viên ở ký túc xá. Phải đóng phí.");
        assert_eq!(chunks[0].metadata.page_label, "1");
    }

    #[test]
    fn sentences_pack_with_overlap() {
        let text = "one two three. four five six. seven eight nine. ten eleven twelve.";
        let parts = chunker(6, 3).split_text(text);
        assert_eq!(parts, vec![
            "one two three. four five six.",
            "four five six. seven eight nine.",
            "seven eight nine. ten eleven twelve.",
        ]);
    }

    #[test]
    fn oversized_sentence_splits_by_words() {
        let text = (0..10).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let parts = chunker(4, 1).split_text(&text);
        assert_eq!(parts, vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]);
    }

    #[test]
    fn ids_are_stable_and_unique() {
        let d = doc("quy_che.txt", "A b c. D e f.\x0cG h i.");
        let c = chunker(3, 1);
        let first = c.chunk(&d);
        let second = c.chunk(&d);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].metadata.page_label, "2");
        let mut ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn same_text_in_different_files_gets_different_ids() {
        assert_ne!(chunk_id("a.txt", "1", 0, "x"), chunk_id("b.txt", "1", 0, "x"));
    }

    #[test]
    fn unsupported_extension_is_content_error() {
        let err = DocumentLoader::from_bytes(Path::new("scan.pdf"), b"%PDF").unwrap_err();
        assert!(err.is_content());
    }

    #[test]
    fn invalid_overlap_rejected() {
        assert!(Chunker::new(ChunkingSettings { chunk_size: 5, chunk_overlap: 5 }).is_err());
    }
}
