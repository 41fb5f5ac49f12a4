use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("Data directory not found: {}", .0.display())]
    DataDirMissing(PathBuf),

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Lexical index error: {0}")]
    LexicalIndex(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Rerank failed: {0}")]
    Rerank(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Stage '{stage}' timed out after {elapsed:?}")]
    Timeout { stage: &'static str, elapsed: Duration },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Configuration errors are fatal at startup and never retried.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::MissingCredential(_) | Self::DataDirMissing(_))
    }

    /// Errors raised by a dependency (model, store, endpoint) for one request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::LexicalIndex(_)
                | Self::VectorStore(_)
                | Self::Embedding(_)
                | Self::Rerank(_)
                | Self::Generation(_)
                | Self::DimensionMismatch { .. }
                | Self::Timeout { .. }
        )
    }

    /// Errors tied to one input file; ingestion reports them and moves on.
    pub fn is_content(&self) -> bool {
        matches!(self, Self::UnsupportedFile(_) | Self::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
