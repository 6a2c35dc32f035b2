//! # docqa gateway
//!
//! Axum server in front of a loaded [`docqa_knowledge::KnowledgeBase`]:
//! an HTML question form at `/` and a small JSON API under `/api`.

pub mod page;
pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
