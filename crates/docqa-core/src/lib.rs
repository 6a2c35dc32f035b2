//! # docqa core
//!
//! Shared building blocks for the docqa workspace:
//! - [`config`]: TOML configuration with per-field defaults
//! - [`error`]: the single error type used by every library crate
//! - [`traits`]: seams for the external collaborators (embedder, answer service)
//! - [`types`]: chat message types sent to generation backends

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DocQaConfig;
pub use error::{DocQaError, Result};
