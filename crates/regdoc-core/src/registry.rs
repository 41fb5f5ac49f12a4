//! Ingestion registry: file name → last ingested content hash.
//!
//! Read entirely at ingestion start and rewritten entirely at the end. The
//! registry is owned by the ingestion path; concurrent writers are not supported.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Outcome of comparing a file's current hash with the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Modified,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: BTreeMap<String, String>,
}

impl Registry {
    /// Load from `path`; a missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&raw).map_err(|e| Error::Registry(format!("{}: {e}", path.display())))
    }

    /// Rewrite the whole file via a sibling temp file and rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Registry(e.to_string()))?;
        let tmp = tmp_path(path);
        fs::write(&tmp, json).map_err(|e| Error::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
    }

    pub fn status(&self, file_name: &str, hash: &str) -> FileStatus {
        match self.entries.get(file_name) {
            None => FileStatus::New,
            Some(h) if h != hash => FileStatus::Modified,
            Some(_) => FileStatus::Unchanged,
        }
    }

    pub fn record(&mut self, file_name: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(file_name.into(), hash.into());
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions() {
        let mut r = Registry::default();
        assert_eq!(r.status("a.txt", "h1"), FileStatus::New);
        r.record("a.txt", "h1");
        assert_eq!(r.status("a.txt", "h1"), FileStatus::Unchanged);
        assert_eq!(r.status("a.txt", "h2"), FileStatus::Modified);
    }

    #[test]
    fn save_load_is_flat_json_object() {
        let tmp = tempfile::tempdir().expect("tmp");
        let path = tmp.path().join("processed_files.json");
        let mut r = Registry::default();
        r.record("quy_che.txt", "abc123");
        r.save(&path).expect("save");

        let raw = fs::read_to_string(&path).expect("read");
        let v: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(v, serde_json::json!({ "quy_che.txt": "abc123" }));
        assert_eq!(Registry::load(&path).expect("load"), r);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::tempdir().expect("tmp");
        assert!(Registry::load(&tmp.path().join("nope.json")).expect("load").is_empty());
    }

    #[test]
    fn corrupt_file_is_registry_error() {
        let tmp = tempfile::tempdir().expect("tmp");
        let path = tmp.path().join("r.json");
        fs::write(&path, "[1,2").expect("write");
        assert!(matches!(Registry::load(&path), Err(Error::Registry(_))));
    }
}
