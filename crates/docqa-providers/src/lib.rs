//! # docqa providers
//!
//! Implementations of the two external collaborators of the retrieval pipeline.
//!
//! All hosted backends (OpenAI, Gemini, Groq, Mistral, Together, Ollama,
//! llama.cpp, vLLM) are handled by a single `OpenAiCompatibleProvider`.
//! The `hash` provider is an offline embedder with no network dependency.

pub mod hashing;
pub mod openai_compatible;
pub mod provider_registry;

use std::sync::Arc;

use docqa_core::config::{AnswerConfig, EmbeddingConfig};
use docqa_core::error::{DocQaError, Result};
use docqa_core::traits::{AnswerService, Embedder};

use hashing::HashingEmbedder;
use openai_compatible::OpenAiCompatibleProvider;

/// Create the embedder named by `[embedding] provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashingEmbedder::new(config.dimensions)?)),

        // Custom endpoint: "custom:https://my-server.com/v1"
        other if other.starts_with("custom:") => {
            Ok(Arc::new(OpenAiCompatibleProvider::for_embedding(None, config)?))
        }

        name => {
            let registry = provider_registry::get_provider_config(name)
                .ok_or_else(|| DocQaError::ProviderNotFound(name.into()))?;
            Ok(Arc::new(OpenAiCompatibleProvider::for_embedding(
                Some(registry),
                config,
            )?))
        }
    }
}

/// Create the answer service named by `[answer] provider`.
pub fn create_answer_service(config: &AnswerConfig) -> Result<Arc<dyn AnswerService>> {
    match config.provider.as_str() {
        other if other.starts_with("custom:") => {
            Ok(Arc::new(OpenAiCompatibleProvider::for_answer(None, config)?))
        }
        name => {
            let registry = provider_registry::get_provider_config(name)
                .ok_or_else(|| DocQaError::ProviderNotFound(name.into()))?;
            Ok(Arc::new(OpenAiCompatibleProvider::for_answer(
                Some(registry),
                config,
            )?))
        }
    }
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("hash");
    names.push("custom");
    names
}
