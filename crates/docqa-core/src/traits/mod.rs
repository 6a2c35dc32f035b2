//! Seams for the external collaborators of the retrieval pipeline.

pub mod answer;
pub mod embedder;

pub use answer::AnswerService;
pub use embedder::Embedder;
