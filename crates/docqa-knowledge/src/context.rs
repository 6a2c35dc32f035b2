//! `KnowledgeBase`: the loaded index, its metadata and the embedder that
//! produced it, built once at startup and shared read-only.

use std::path::Path;

use docqa_core::error::{DocQaError, Result};
use docqa_core::traits::AnswerService;

use crate::answer::Answer;
use crate::document::load_document;
use crate::metadata::MetadataRecord;
use crate::pipeline::{KnowledgeIndex, RetrievalPipeline, RetrievedChunk};
use crate::store::{IndexInfo, IndexStore};

pub struct KnowledgeBase {
    pipeline: RetrievalPipeline,
    knowledge: KnowledgeIndex,
    info: IndexInfo,
}

impl KnowledgeBase {
    pub fn new(pipeline: RetrievalPipeline, knowledge: KnowledgeIndex, info: IndexInfo) -> Self {
        Self {
            pipeline,
            knowledge,
            info,
        }
    }

    /// Load, chunk and embed `document`.
    pub async fn build(document: &Path, pipeline: RetrievalPipeline) -> Result<Self> {
        tracing::info!("📄 Building index from {}", document.display());
        let paragraphs = load_document(document)?;
        let fingerprint = IndexStore::fingerprint(document)?;
        let knowledge = pipeline.build(&paragraphs).await?;
        let info = IndexInfo::new(&knowledge, pipeline.embedder().model(), Some(fingerprint));
        Ok(Self {
            pipeline,
            knowledge,
            info,
        })
    }

    /// Open a persisted index.
    pub fn load(index_path: &Path, pipeline: RetrievalPipeline) -> Result<Self> {
        let (knowledge, info) = IndexStore::load(index_path)?;
        if info.embedding_model != pipeline.embedder().model() {
            tracing::warn!(
                "⚠️ Index was built with '{}' but the embedder is '{}'",
                info.embedding_model,
                pipeline.embedder().model()
            );
        }
        Ok(Self {
            pipeline,
            knowledge,
            info,
        })
    }

    /// Open `index_path` if it is current, otherwise rebuild from `document`
    /// and rewrite the file.
    ///
    /// The index is stale when it was built with another embedding model or
    /// from a different version of the document.
    pub async fn load_or_build(
        index_path: &Path,
        document: Option<&Path>,
        pipeline: RetrievalPipeline,
    ) -> Result<Self> {
        if index_path.exists() {
            match IndexStore::load(index_path) {
                Ok((knowledge, info)) => {
                    if is_current(&info, document, pipeline.embedder().model())? {
                        return Ok(Self {
                            pipeline,
                            knowledge,
                            info,
                        });
                    }
                    tracing::info!("🔄 Index at {} is stale, rebuilding", index_path.display());
                }
                Err(e) if document.is_some() => {
                    tracing::warn!("⚠️ Could not load {}: {e}; rebuilding", index_path.display());
                }
                Err(e) => return Err(e),
            }
        }

        let document = document.ok_or_else(|| {
            DocQaError::Config(format!(
                "no index at {} and no document configured to build one",
                index_path.display()
            ))
        })?;
        let base = Self::build(document, pipeline).await?;
        base.save(index_path)?;
        Ok(base)
    }

    pub fn save(&self, index_path: &Path) -> Result<()> {
        IndexStore::save(index_path, &self.knowledge, &self.info)
    }

    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.pipeline.retrieve(&self.knowledge, question, k).await
    }

    pub async fn query(&self, question: &str, k: usize) -> Result<Vec<MetadataRecord>> {
        self.pipeline.query(&self.knowledge, question, k).await
    }

    /// Retrieve context for `question` and, if a service is given, answer it.
    pub async fn ask(
        &self,
        question: &str,
        k: usize,
        answerer: Option<&dyn AnswerService>,
    ) -> Result<Answer> {
        let chunks = self.retrieve(question, k).await?;
        let answer = Answer::from_chunks(question.trim(), chunks);
        match answerer {
            Some(service) => Ok(answer.generate(service).await),
            None => Ok(answer),
        }
    }

    /// Debug listing of every chunk, content cut to `preview_chars`.
    pub fn log_chunks(&self, preview_chars: usize) {
        for (i, record) in self.records().enumerate() {
            tracing::debug!(
                "Chunk {}: Heading: {}, Content: {}",
                i + 1,
                record.heading,
                record.preview(preview_chars)
            );
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.knowledge.metadata().iter()
    }

    pub fn info(&self) -> &IndexInfo {
        &self.info
    }

    pub fn knowledge(&self) -> &KnowledgeIndex {
        &self.knowledge
    }

    pub fn len(&self) -> usize {
        self.knowledge.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knowledge.is_empty()
    }
}

fn is_current(info: &IndexInfo, document: Option<&Path>, model: &str) -> Result<bool> {
    if info.embedding_model != model {
        return Ok(false);
    }
    match document {
        Some(path) if path.exists() => {
            let fingerprint = IndexStore::fingerprint(path)?;
            Ok(info.document_fingerprint.as_deref() == Some(fingerprint.as_str()))
        }
        _ => Ok(true),
    }
}
