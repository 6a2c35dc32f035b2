//! Turning retrieved chunks into an answer.

use docqa_core::traits::AnswerService;
use serde::Serialize;

use crate::pipeline::RetrievedChunk;

/// Shown instead of an answer when retrieval comes back empty.
pub const NO_CONTEXT_FOUND: &str = "No relevant context found.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Join chunks as `"{heading}\n\n{content}"` blocks separated by `---` rules.
pub fn join_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("{}\n\n{}", c.record.heading, c.record.content))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Result of a question: the retrieved context and, when requested, the answer.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: Option<String>,
    pub context: String,
    pub chunks: Vec<RetrievedChunk>,
}

impl Answer {
    /// Wrap retrieval results. An empty result already carries its answer.
    pub fn from_chunks(question: impl Into<String>, chunks: Vec<RetrievedChunk>) -> Self {
        let answer = chunks.is_empty().then(|| NO_CONTEXT_FOUND.to_string());
        Self {
            question: question.into(),
            answer,
            context: join_context(&chunks),
            chunks,
        }
    }

    /// Ask `service` for an answer over the joined context.
    ///
    /// Never fails: an upstream error becomes the answer text and is logged.
    /// Nothing is sent when there is no context.
    pub async fn generate(mut self, service: &dyn AnswerService) -> Self {
        if self.chunks.is_empty() {
            return self;
        }
        let text = match service.answer(&self.context, &self.question).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("⚠️ {} answer failed: {e}", service.name());
                format!("Error from answer service: {e}")
            }
        };
        self.answer = Some(text);
        self
    }

    /// The answer, or an empty string when none was requested.
    pub fn answer_text(&self) -> &str {
        self.answer.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataRecord;
    use crate::testing::EchoAnswerer;

    fn chunk(position: usize, heading: &str, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            position,
            score: 0.9,
            record: MetadataRecord::new(heading, content),
        }
    }

    #[test]
    fn test_join_context() {
        let joined = join_context(&[
            chunk(0, "Intro | Overview", "Body A"),
            chunk(1, "Intro | Details", "Body B"),
        ]);
        assert_eq!(
            joined,
            "Intro | Overview\n\nBody A\n\n---\n\nIntro | Details\n\nBody B"
        );
        assert_eq!(join_context(&[chunk(0, "H", "C")]), "H\n\nC");
    }

    #[tokio::test]
    async fn test_no_context_skips_service() {
        let service = EchoAnswerer::default();
        let answer = Answer::from_chunks("why?", Vec::new()).generate(&service).await;
        assert_eq!(answer.answer_text(), NO_CONTEXT_FOUND);
        assert_eq!(answer.context, "");
        assert_eq!(*service.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_generate_uses_context() {
        let service = EchoAnswerer::default();
        let answer = Answer::from_chunks("why?", vec![chunk(0, "H", "C")])
            .generate(&service)
            .await;
        assert_eq!(answer.answer_text(), "why? (4 context chars)");
        assert_eq!(*service.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_becomes_answer_text() {
        let service = EchoAnswerer {
            fail: true,
            ..Default::default()
        };
        let answer = Answer::from_chunks("why?", vec![chunk(0, "H", "C")])
            .generate(&service)
            .await;
        assert!(answer.answer_text().starts_with("Error from answer service:"));
        assert!(answer.answer_text().contains("503"));
    }

    #[test]
    fn test_without_generation_answer_is_empty() {
        let answer = Answer::from_chunks("q", vec![chunk(0, "H", "C")]);
        assert_eq!(answer.answer, None);
        assert_eq!(answer.answer_text(), "");
    }
}
