//! Error type shared by all docqa crates.

use thiserror::Error;

/// Every failure the retrieval core and its collaborators can report.
#[derive(Debug, Error)]
pub enum DocQaError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Document produced no chunks")]
    EmptyDocument,

    #[error("Query is empty")]
    EmptyQuery,

    #[error("top_k must be greater than zero")]
    InvalidTopK,

    #[error("Position {position} out of range (size {size})")]
    OutOfRange { position: usize, size: usize },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Vector{} has zero or non-finite norm", position_label(.position))]
    ZeroVector { position: Option<usize> },

    #[error("{service} request failed{}: {message}", status_label(.status))]
    Upstream {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn position_label(position: &Option<usize>) -> String {
    position.map(|p| format!(" at position {p}")).unwrap_or_default()
}

fn status_label(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

impl DocQaError {
    /// Build an upstream error for a collaborator without an HTTP status.
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Only upstream failures are worth retrying; the core never retries them itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }

    /// Edge cases that callers handle as normal control flow rather than crashes.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::EmptyIndex | Self::EmptyDocument | Self::EmptyQuery)
    }
}

pub type Result<T> = std::result::Result<T, DocQaError>;
