use apihist_legacy::ParseError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Legacy dump error: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to acquire build {hash}: {source}")]
    Acquire {
        hash: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist build {hash}: {source}")]
    Persist {
        hash: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load reference snapshot {path}: {message}")]
    Reference { path: PathBuf, message: String },

    #[error("Invalid build list {path}: {message}")]
    BuildList { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
