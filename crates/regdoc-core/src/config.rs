//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `regdoc.toml` + `regdoc.<env>.toml`
//! + `REGDOC_*` env vars (`__` separates nested keys) into one immutable
//! [`Settings`] value that is built once at startup and shared by reference.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::DistanceMetric;

pub const DEFAULT_CONFIG_FILE: &str = "regdoc.toml";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub vector: VectorSettings,
    pub rerank: RerankSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub synthesis: SynthesisSettings,
    pub timeouts: TimeoutSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub data_dir: PathBuf,
    pub registry_file: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), registry_file: PathBuf::from("processed_files.json") }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_id: String,
    pub model_dir: PathBuf,
    pub dimension: usize,
    pub max_len: usize,
    /// Use the deterministic hashing embedder instead of loading a model.
    pub fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
            dimension: 384,
            max_len: 256,
            fake: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub db_dir: PathBuf,
    pub index_name: String,
    pub metric: DistanceMetric,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self { db_dir: PathBuf::from("indexes/lancedb"), index_name: "regulations".to_string(), metric: DistanceMetric::Cosine }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub model_id: String,
    pub model_dir: PathBuf,
    pub top_n: usize,
    pub max_len: usize,
    /// Use the lexical-overlap cross-encoder instead of loading a model.
    pub fake: bool,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            model_id: "BAAI/bge-reranker-base".to_string(),
            model_dir: PathBuf::from("models/bge-reranker-base"),
            top_n: 3,
            max_len: 512,
            fake: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub dense_top_k: usize,
    pub lexical_top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { dense_top_k: 10, lexical_top_k: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub max_context_chars: usize,
    pub deflection_message: String,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            max_context_chars: 12_000,
            deflection_message: "Thông tin không được đề cập trong tài liệu, vui lòng liên hệ trang dsa.ctu.edu.vn"
                .to_string(),
        }
    }
}

/// Per-stage time bounds, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub rewrite_secs: u64,
    pub retrieve_secs: u64,
    pub rerank_secs: u64,
    pub synthesize_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self { rewrite_secs: 30, retrieve_secs: 30, rerank_secs: 60, synthesize_secs: 60 }
    }
}

impl TimeoutSettings {
    pub fn rewrite(&self) -> Duration { Duration::from_secs(self.rewrite_secs) }
    pub fn retrieve(&self) -> Duration { Duration::from_secs(self.retrieve_secs) }
    pub fn rerank(&self) -> Duration { Duration::from_secs(self.rerank_secs) }
    pub fn synthesize(&self) -> Duration { Duration::from_secs(self.synthesize_secs) }
    /// Longest single-call bound, used as the HTTP client timeout.
    pub fn longest(&self) -> Duration {
        [self.rewrite_secs, self.retrieve_secs, self.rerank_secs, self.synthesize_secs]
            .into_iter()
            .max()
            .map_or(Duration::from_secs(60), Duration::from_secs)
    }
}

impl Settings {
    /// Load from `regdoc.toml` in the working directory plus the env overlay.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load with `config_file` as the base file; `<stem>.<env>.toml` next to it
    /// is merged on top, then `REGDOC_*` variables and `OPENAI_API_KEY`.
    /// Relative paths are resolved against the config file's directory.
    pub fn load_from(config_file: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let figment = Self::figment(config_file, &env_name);
        let mut settings: Settings = figment.extract().map_err(|e| Error::Config(e.to_string()))?;
        let base = config_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        settings.resolve_paths(base);
        settings.validate()?;
        Ok(settings)
    }

    fn figment(config_file: &Path, env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(config_file));
        let env_file = match env_name {
            "dev" | "development" => Some("dev"),
            "prod" | "production" => Some("prod"),
            "test" | "testing" => Some("test"),
            _ => None,
        };
        if let Some(suffix) = env_file {
            let stem = config_file.file_stem().and_then(|s| s.to_str()).unwrap_or("regdoc");
            figment = figment.merge(Toml::file(config_file.with_file_name(format!("{stem}.{suffix}.toml"))));
        }
        figment
            .merge(Env::raw().only(&[API_KEY_ENV]).map(|_| "llm.api_key".into()))
            .merge(Env::prefixed("REGDOC_").split("__"))
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.data.data_dir = resolve_with_base(base, self.data.data_dir.to_string_lossy());
        self.data.registry_file = resolve_with_base(base, self.data.registry_file.to_string_lossy());
        self.vector.db_dir = resolve_with_base(base, self.vector.db_dir.to_string_lossy());
        self.embedding.model_dir = resolve_with_base(base, self.embedding.model_dir.to_string_lossy());
        self.rerank.model_dir = resolve_with_base(base, self.rerank.model_dir.to_string_lossy());
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".into()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::Config("embedding.dimension must be > 0".into()));
        }
        if self.retrieval.dense_top_k == 0 || self.retrieval.lexical_top_k == 0 {
            return Err(Error::Config("retrieval top_k values must be > 0".into()));
        }
        if self.rerank.top_n == 0 {
            return Err(Error::Config("rerank.top_n must be > 0".into()));
        }
        let t = &self.timeouts;
        for (name, secs) in [("rewrite", t.rewrite_secs), ("retrieve", t.retrieve_secs), ("rerank", t.rerank_secs), ("synthesize", t.synthesize_secs)] {
            if secs == 0 {
                return Err(Error::Config(format!("timeouts.{name}_secs must be > 0")));
            }
        }
        if self.synthesis.deflection_message.trim().is_empty() {
            return Err(Error::Config("synthesis.deflection_message must not be empty".into()));
        }
        Ok(())
    }

    /// The generation API key, or a configuration error naming the variable.
    pub fn require_api_key(&self) -> Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(Error::MissingCredential(API_KEY_ENV))
    }

    pub fn require_data_dir(&self) -> Result<&Path> {
        if self.data.data_dir.is_dir() { Ok(&self.data.data_dir) } else { Err(Error::DataDirMissing(self.data.data_dir.clone())) }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_pipeline_contract() {
        let s = Settings::default();
        assert_eq!(s.chunking.chunk_size, 512);
        assert_eq!(s.chunking.chunk_overlap, 50);
        assert_eq!(s.embedding.dimension, 384);
        assert_eq!(s.retrieval.dense_top_k, 10);
        assert_eq!(s.retrieval.lexical_top_k, 10);
        assert_eq!(s.rerank.top_n, 3);
        assert_eq!(s.vector.metric, DistanceMetric::Cosine);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn toml_env_and_api_key_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "regdoc.toml",
                r#"
                [data]
                data_dir = "docs"
                [rerank]
                top_n = 5
                "#,
            )?;
            jail.create_file("regdoc.test.toml", "[retrieval]\ndense_top_k = 7\n")?;
            jail.set_env("RUST_ENV", "test");
            jail.set_env("REGDOC_RETRIEVAL__LEXICAL_TOP_K", "4");
            jail.set_env("OPENAI_API_KEY", "sk-test");

            let s = Settings::load().expect("load");
            assert!(s.data.data_dir.ends_with("docs"));
            assert_eq!(s.rerank.top_n, 5);
            assert_eq!(s.retrieval.dense_top_k, 7);
            assert_eq!(s.retrieval.lexical_top_k, 4);
            assert_eq!(s.require_api_key().expect("key"), "sk-test");
            Ok(())
        });
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let s = Settings::default();
        let err = s.require_api_key().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("regdoc.toml", "[chunking]\nchunk_size = 10\nchunk_overlap = 10\n")?;
            let err = Settings::load().unwrap_err();
            assert!(err.is_config());
            Ok(())
        });
    }

    #[test]
    fn zero_stage_timeout_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("regdoc.toml", "[timeouts]\nrerank_secs = 0\n")?;
            let err = Settings::load().unwrap_err();
            assert!(err.is_config());
            assert!(err.to_string().contains("timeouts.rerank_secs"));
            Ok(())
        });
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/regdoc");
        assert_eq!(resolve_with_base(base, "data"), PathBuf::from("/srv/regdoc/data"));
        assert_eq!(resolve_with_base(base, "/abs/data"), PathBuf::from("/abs/data"));
    }
}
