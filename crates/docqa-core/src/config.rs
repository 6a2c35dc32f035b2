//! docqa configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DocQaError, Result};

/// System prompt sent ahead of every (context, question) pair.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert assistant for a Retrieval-Augmented Generation (RAG) application. \
Given the provided context chunk from a document and a user question, answer as accurately and concisely as possible. \
If the answer is not present in the context, say 'The answer is not available in the provided context.' \
Always cite the heading in your answer if relevant.";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocQaConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for DocQaConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            answer: AnswerConfig::default(),
            retrieval: RetrievalConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl DocQaConfig {
    /// Load config from `DOCQA_CONFIG` or the default path (~/.docqa/config.toml).
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("DOCQA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DocQaError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DocQaError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 || self.retrieval.api_top_k == 0 {
            return Err(DocQaError::Config("retrieval top_k values must be > 0".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(DocQaError::Config("embedding.batch_size must be > 0".into()));
        }
        if self.embedding.provider == "hash" && self.embedding.dimensions == 0 {
            return Err(DocQaError::Config(
                "embedding.dimensions must be > 0 for the hash provider".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the docqa home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docqa")
    }
}

/// Expand a leading `~` in a configured path.
pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// Where the persisted index lives and which document it is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// SQLite file holding the vector index and its metadata as one matched pair.
    #[serde(default = "default_index_path")]
    pub path: String,
    /// Source document used when the index has to be (re)built.
    #[serde(default)]
    pub document: Option<String>,
}

fn default_index_path() -> String { "~/.docqa/index.db".into() }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            document: None,
        }
    }
}

impl IndexConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_path(&self.path)
    }

    pub fn resolved_document(&self) -> Option<PathBuf> {
        self.document.as_deref().map(expand_path)
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Empty means the provider's default embedding model.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Only used by the offline `hash` provider.
    #[serde(default = "default_hash_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_embedding_provider() -> String { "openai".into() }
fn default_batch_size() -> usize { 64 }
fn default_hash_dimensions() -> usize { 384 }
fn default_timeout() -> u64 { 60 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            batch_size: default_batch_size(),
            dimensions: default_hash_dimensions(),
            request_timeout_secs: default_timeout(),
        }
    }
}

/// Answer (text generation) backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    #[serde(default = "default_answer_provider")]
    pub provider: String,
    /// Empty means the provider's default chat model.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_answer_provider() -> String { "gemini".into() }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> u32 { 1024 }
fn default_system_prompt() -> String { DEFAULT_SYSTEM_PROMPT.into() }

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_answer_provider(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            request_timeout_secs: default_timeout(),
        }
    }
}

/// Retrieval defaults for the query surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunks retrieved for the HTML form and the CLI.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Chunks retrieved for `/api/ask` when the request does not name `k`.
    #[serde(default = "default_api_top_k")]
    pub api_top_k: usize,
    /// Characters of chunk content shown in debug previews.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_top_k() -> usize { 5 }
fn default_api_top_k() -> usize { 1 }
fn default_preview_chars() -> usize { 100 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            api_top_k: default_api_top_k(),
            preview_chars: default_preview_chars(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 5000 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}
