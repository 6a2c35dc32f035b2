//! Test doubles shared by the module tests.

use std::sync::Mutex;

use async_trait::async_trait;
use docqa_core::error::{DocQaError, Result};
use docqa_core::traits::{AnswerService, Embedder};

use crate::document::Paragraph;

const VOCABULARY: &[&str] = &["intro", "overview", "details", "body", "setup", "install"];

/// Bag-of-words embedder over a tiny fixed vocabulary plus a bias term,
/// so no input maps to the zero vector.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub batches: Mutex<Vec<usize>>,
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; VOCABULARY.len() + 1];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
    {
        if let Some(i) = VOCABULARY.iter().position(|w| *w == word) {
            v[i] += 1.0;
        }
    }
    v[VOCABULARY.len()] = 1.0;
    v
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    fn model(&self) -> &str {
        "keyword-v1"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.len());
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

/// Embedder that drops the last vector of every batch.
pub struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    fn name(&self) -> &str {
        "short"
    }

    fn model(&self) -> &str {
        "short-v1"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .skip(1)
            .map(|t| keyword_vector(t))
            .collect())
    }
}

/// Echoes how much context it was given, or fails on demand.
#[derive(Default)]
pub struct EchoAnswerer {
    pub fail: bool,
    pub calls: Mutex<usize>,
}

#[async_trait]
impl AnswerService for EchoAnswerer {
    fn name(&self) -> &str {
        "echo"
    }

    async fn answer(&self, context: &str, question: &str) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(DocQaError::Upstream {
                service: "echo".into(),
                status: Some(503),
                message: "unavailable".into(),
            });
        }
        Ok(format!("{question} ({} context chars)", context.len()))
    }
}

pub fn scenario() -> Vec<Paragraph> {
    vec![
        Paragraph::heading(1, "Intro"),
        Paragraph::heading(2, "Overview"),
        Paragraph::body("Body A"),
        Paragraph::body("Body A2"),
        Paragraph::heading(2, "Details"),
        Paragraph::body("Body B"),
    ]
}
