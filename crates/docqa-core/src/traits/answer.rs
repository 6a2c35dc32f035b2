//! AnswerService trait: turns retrieved context plus a question into an answer.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Generate an answer grounded in `context`.
    async fn answer(&self, context: &str, question: &str) -> Result<String>;
}
