//! Embedder trait: maps text to fixed-dimension vectors.

use async_trait::async_trait;

use crate::error::Result;

/// Text → vector service.
///
/// Implementations must return exactly one vector per input, in input order,
/// and every vector from a given model identity must have the same length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name (e.g., "openai", "hash").
    fn name(&self) -> &str;

    /// Model identity. Persisted next to the index so a model switch is detected on load.
    fn model(&self) -> &str;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
