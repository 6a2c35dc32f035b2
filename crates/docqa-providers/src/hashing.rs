//! Offline feature-hashing embedder.
//!
//! Each lowercase word is hashed (FNV-1a, 64-bit) into one of `d` buckets with
//! a sign taken from the top hash bit. Identical texts always map to identical
//! vectors, and texts sharing words land close together, which is enough for
//! keyword-style retrieval on machines without network access.

use async_trait::async_trait;
use docqa_core::error::{DocQaError, Result};
use docqa_core::traits::Embedder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

pub struct HashingEmbedder {
    dimensions: usize,
    model: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(DocQaError::Config("hash embedder needs dimensions > 0".into()));
        }
        Ok(Self {
            dimensions,
            model: format!("hash-{dimensions}"),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text.
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        let mut seen_word = false;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            seen_word = true;
            self.add_feature(&mut v, word.to_lowercase().as_bytes());
        }
        // Punctuation-only input still gets a direction.
        if !seen_word {
            for c in text.trim().chars() {
                let mut buf = [0u8; 4];
                self.add_feature(&mut v, c.encode_utf8(&mut buf).as_bytes());
            }
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], feature: &[u8]) {
        let h = fnv1a(feature);
        let bucket = (h % self.dimensions as u64) as usize;
        let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
        v[bucket] += sign;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}
