//! Retrieval pipeline: Chunker → Embedder → index at build time,
//! Embedder → index → metadata at query time.

use std::sync::Arc;

use docqa_core::error::{DocQaError, Result};
use docqa_core::traits::Embedder;
use serde::Serialize;

use crate::chunker::{Chunk, Chunker};
use crate::document::Paragraph;
use crate::index::VectorIndex;
use crate::metadata::{MetadataRecord, MetadataStore};

/// Default number of texts sent to the embedder per request.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// The matched pair: vector `i` and record `i` describe the same chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeIndex {
    index: VectorIndex,
    metadata: MetadataStore,
}

impl KnowledgeIndex {
    /// Pair an index with its metadata. Lengths must agree.
    pub fn from_parts(index: VectorIndex, metadata: MetadataStore) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(DocQaError::CorruptIndex(format!(
                "{} vectors but {} metadata records",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self { index, metadata })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }
}

/// A search hit joined to its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub position: usize,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    #[serde(flatten)]
    pub record: MetadataRecord,
}

pub struct RetrievalPipeline {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl RetrievalPipeline {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Chunk, embed and index a document.
    pub async fn build(&self, paragraphs: &[Paragraph]) -> Result<KnowledgeIndex> {
        let chunks = Chunker::chunk(paragraphs);
        self.build_chunks(chunks).await
    }

    /// Embed and index already-chunked content.
    pub async fn build_chunks(&self, chunks: Vec<Chunk>) -> Result<KnowledgeIndex> {
        if chunks.is_empty() {
            return Err(DocQaError::EmptyDocument);
        }

        let texts: Vec<String> = chunks.iter().map(Chunk::embedding_text).collect();
        let vectors = self.embed_batched(&texts).await?;
        let index = VectorIndex::build(vectors)?;

        let metadata: MetadataStore = chunks
            .into_iter()
            .map(|chunk| MetadataRecord::new(chunk.heading(), chunk.content))
            .collect();

        tracing::info!(
            "📚 Indexed {} chunks ({} dimensions, model {})",
            metadata.len(),
            index.dimensions(),
            self.embedder.model()
        );
        KnowledgeIndex::from_parts(index, metadata)
    }

    /// Top-`k` chunks for `question`, best first, with similarity scores.
    ///
    /// An empty index yields an empty list without calling the embedder.
    pub async fn retrieve(
        &self,
        knowledge: &KnowledgeIndex,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DocQaError::EmptyQuery);
        }
        if k == 0 {
            return Err(DocQaError::InvalidTopK);
        }
        if knowledge.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embed_query(question).await?;
        let hits = knowledge.index.search(&query, k)?;
        tracing::debug!(
            "🔎 {} hits for {:?}: {:?}",
            hits.len(),
            question,
            hits.iter().map(|h| (h.position, h.distance)).collect::<Vec<_>>()
        );

        hits.into_iter()
            .map(|hit| {
                let record = knowledge.metadata.get(hit.position).map_err(|e| {
                    DocQaError::CorruptIndex(format!("search hit has no metadata: {e}"))
                })?;
                Ok(RetrievedChunk {
                    position: hit.position,
                    score: hit.score,
                    record: record.clone(),
                })
            })
            .collect()
    }

    /// Top-`k` metadata records for `question`, best first.
    pub async fn query(
        &self,
        knowledge: &KnowledgeIndex,
        question: &str,
        k: usize,
    ) -> Result<Vec<MetadataRecord>> {
        Ok(self
            .retrieve(knowledge, question, k)
            .await?
            .into_iter()
            .map(|chunk| chunk.record)
            .collect())
    }

    async fn embed_query(&self, question: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batched(&[question.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            DocQaError::upstream(self.embedder.name(), "no vector returned for query")
        })
    }

    async fn embed_batched(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.embedder.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(DocQaError::upstream(
                    self.embedder.name(),
                    format!(
                        "returned {} vectors for {} inputs",
                        embedded.len(),
                        batch.len()
                    ),
                ));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
