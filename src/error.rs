//! Error types for Eto.

use thiserror::Error;

/// Library-level error type for Eto operations.
#[derive(Error, Debug)]
pub enum EtoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vector database error: {0}")]
    Lance(#[from] lancedb::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

impl EtoError {
    /// Whether the failure came from the network or a remote API and may
    /// succeed if the call is repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, EtoError::Http(_) | EtoError::OpenAI(_))
    }
}

/// Result type alias for Eto operations.
pub type Result<T> = std::result::Result<T, EtoError>;
