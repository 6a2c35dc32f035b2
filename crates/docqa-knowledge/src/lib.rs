//! # docqa knowledge
//!
//! Retrieval pipeline over a single headed document.
//!
//! ## Design
//! - **Chunker**: heading state machine, one chunk per (H1, H2) section
//! - **Flat cosine index**: unit vectors, exact k-NN by squared L2 distance
//! - **Metadata store**: heading + content, positionally aligned with the index
//! - **SQLite file**: index and metadata persisted as one matched pair
//!
//! ## How it works
//! ```text
//! document.docx / .md / .txt
//!   ↓ document::load_document
//! paragraphs (style + text)
//!   ↓ Chunker
//! chunks [H1, H2] + body
//!   ↓ Embedder ("H1 | H2 | body")
//! KnowledgeIndex { VectorIndex, MetadataStore }  ──→  index.db
//!
//! question ─→ Embedder ─→ VectorIndex::search ─→ MetadataStore::get ─→ context
//! ```

pub mod answer;
pub mod chunker;
pub mod context;
pub mod document;
pub mod index;
pub mod metadata;
pub mod pipeline;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use answer::{Answer, NO_CONTEXT_FOUND, join_context};
pub use chunker::{Chunk, Chunker};
pub use context::KnowledgeBase;
pub use document::{Paragraph, ParagraphStyle, load_document};
pub use index::{SearchHit, VectorIndex};
pub use metadata::{MetadataRecord, MetadataStore};
pub use pipeline::{KnowledgeIndex, RetrievalPipeline, RetrievedChunk};
pub use store::{IndexInfo, IndexStore};
