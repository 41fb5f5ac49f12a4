use std::fs;
use std::io::Write;
use tempfile::TempDir;

use regdoc_core::chunker::{list_source_files, Chunker, DocumentLoader};
use regdoc_core::config::ChunkingSettings;

#[test]
fn single_small_file_is_one_chunk() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let doc = DocumentLoader::load(&file_path).expect("load");
    let chunks = Chunker::new(ChunkingSettings::default()).unwrap().chunk(&doc);

    assert_eq!(chunks.len(), 1, "one small paragraph becomes one chunk");
    assert_eq!(chunks[0].text, "Short text");
    assert_eq!(chunks[0].metadata.file_name, "a.txt");
}

#[test]
fn listing_skips_hidden_and_nested_entries() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();
    fs::write(dir.join("a.md"), "alpha bravo").unwrap();
    fs::write(dir.join(".DS_Store"), "junk").unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/c.txt"), "echo").unwrap();

    let files = list_source_files(dir).expect("list");
    let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();
    assert_eq!(names, vec!["a.md", "b.txt"]);
}

#[test]
fn missing_data_dir_is_config_error() {
    let tmp = TempDir::new().unwrap();
    let err = list_source_files(&tmp.path().join("data")).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn non_utf8_bytes_are_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("latin.txt");
    fs::write(&path, [b'a', b'b', 0xff, b'c']).unwrap();
    let doc = DocumentLoader::load(&path).expect("load");
    assert!(doc.text().starts_with("ab"));
    assert_eq!(doc.content_hash.len(), 64);
}
