//! # docqa
//!
//! Ask natural-language questions against a headed document.
//!
//! Usage:
//!   docqa build handbook.docx            # Chunk, embed and persist the index
//!   docqa ask "What is the refund policy?"
//!   docqa search "refund" -k 3           # Scored chunks, no answer
//!   docqa inspect --full                 # List stored chunks
//!   docqa serve --port 5000              # HTML form + JSON API

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_core::DocQaConfig;
use docqa_core::config::expand_path;
use docqa_knowledge::{IndexStore, KnowledgeBase, KnowledgeIndex, RetrievalPipeline};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docqa",
    version,
    about = "📚 docqa: retrieval-augmented answers over a single document"
)]
struct Cli {
    /// Config file (default: $DOCQA_CONFIG or ~/.docqa/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and persist a document
    Build {
        /// Document to index (.docx, .md or plain text); defaults to [index] document
        document: Option<String>,
        /// Index file; defaults to [index] path
        #[arg(long)]
        index: Option<String>,
    },
    /// Retrieve context and answer a question
    Ask {
        question: String,
        /// Number of chunks to retrieve
        #[arg(short)]
        k: Option<usize>,
        /// Print the retrieved context only
        #[arg(long)]
        no_answer: bool,
    },
    /// Print scored chunks for a question
    Search {
        question: String,
        #[arg(short)]
        k: Option<usize>,
    },
    /// List the chunks stored in an index file
    Inspect {
        #[arg(long)]
        index: Option<String>,
        /// Print each chunk's full content instead of a preview
        #[arg(long)]
        full: bool,
    },
    /// Start the HTTP gateway
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
        /// Document to build from when the index is missing or stale
        #[arg(long)]
        document: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> Result<DocQaConfig> {
    let config = match path {
        Some(p) => DocQaConfig::load_from(&expand_path(p))?,
        None => DocQaConfig::load()?,
    };
    Ok(config)
}

fn pipeline(config: &DocQaConfig) -> Result<RetrievalPipeline> {
    let embedder = docqa_providers::create_embedder(&config.embedding)?;
    Ok(RetrievalPipeline::new(embedder).with_batch_size(config.embedding.batch_size))
}

async fn open_knowledge(config: &DocQaConfig, document: Option<PathBuf>) -> Result<KnowledgeBase> {
    let index_path = config.index.resolved_path();
    let document = document.or_else(|| config.index.resolved_document());
    let base = KnowledgeBase::load_or_build(&index_path, document.as_deref(), pipeline(config)?)
        .await
        .with_context(|| format!("opening index {}", index_path.display()))?;
    base.log_chunks(config.retrieval.preview_chars);
    Ok(base)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "docqa=debug,docqa_knowledge=debug,docqa_providers=debug,docqa_gateway=debug,tower_http=debug"
    } else {
        "docqa=info,docqa_knowledge=info,docqa_providers=info,docqa_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Build { document, index } => {
            let document = document
                .map(|d| expand_path(&d))
                .or_else(|| config.index.resolved_document())
                .context("no document given and [index] document is not set")?;
            let index_path = index
                .map(|p| expand_path(&p))
                .unwrap_or_else(|| config.index.resolved_path());

            let base = KnowledgeBase::build(&document, pipeline(&config)?).await?;
            base.save(&index_path)?;
            base.log_chunks(config.retrieval.preview_chars);
            println!(
                "✅ Indexed {} chunks from {} → {}",
                base.len(),
                document.display(),
                index_path.display()
            );
        }

        Command::Ask { question, k, no_answer } => {
            let base = open_knowledge(&config, None).await?;
            let answerer = if no_answer {
                None
            } else {
                Some(docqa_providers::create_answer_service(&config.answer)?)
            };
            let k = k.unwrap_or(config.retrieval.top_k);
            let answer = base.ask(&question, k, answerer.as_deref()).await?;

            if let Some(text) = &answer.answer {
                println!("{text}\n");
            }
            for chunk in &answer.chunks {
                println!("── {} ({:.3})", chunk.record.heading, chunk.score);
                println!("{}\n", chunk.record.content);
            }
        }

        Command::Search { question, k } => {
            let base = open_knowledge(&config, None).await?;
            let k = k.unwrap_or(config.retrieval.top_k);
            let hits = base.retrieve(&question, k).await?;
            if hits.is_empty() {
                println!("{}", docqa_knowledge::NO_CONTEXT_FOUND);
            }
            for hit in hits {
                println!(
                    "#{:<3} {:.4}  {}  {}",
                    hit.position,
                    hit.score,
                    hit.record.heading,
                    hit.record.preview(config.retrieval.preview_chars)
                );
            }
        }

        Command::Inspect { index, full } => {
            let index_path = index
                .map(|p| expand_path(&p))
                .unwrap_or_else(|| config.index.resolved_path());
            let preview = (!full).then_some(config.retrieval.preview_chars);
            inspect(&index_path, preview)?;
        }

        Command::Serve { port, host, document } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            let base = open_knowledge(&config, document.map(|d| expand_path(&d))).await?;
            let answerer = docqa_providers::create_answer_service(&config.answer)
                .map_err(|e| tracing::warn!("⚠️ Answer service unavailable: {e}; serving retrieval only"))
                .ok();

            let state = docqa_gateway::AppState::new(
                config.gateway.clone(),
                config.retrieval.clone(),
                Arc::new(base),
                answerer,
            );
            docqa_gateway::start(state).await?;
        }
    }

    Ok(())
}

fn inspect(index_path: &Path, preview_chars: Option<usize>) -> Result<()> {
    let (knowledge, info) = IndexStore::load(index_path)?;
    println!("📂 {}", index_path.display());
    println!("   Chunks:     {}", info.count);
    println!("   Dimensions: {}", info.dimensions);
    println!("   Model:      {}", info.embedding_model);
    println!("   Built:      {}", info.built_at.to_rfc3339());
    if let Some(fingerprint) = &info.document_fingerprint {
        println!("   Document:   sha256:{fingerprint}");
    }
    println!();
    print!("{}", chunk_listing(&knowledge, preview_chars));
    Ok(())
}

/// One block per chunk; `None` prints the content in full.
fn chunk_listing(knowledge: &KnowledgeIndex, preview_chars: Option<usize>) -> String {
    let mut out = String::new();
    for (i, record) in knowledge.metadata().iter().enumerate() {
        let content = match preview_chars {
            Some(n) => record.preview(n),
            None => record.content.clone(),
        };
        out.push_str(&format!("Chunk {}: {}\n{}\n\n", i + 1, record.heading, content));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_knowledge::{MetadataRecord, MetadataStore, VectorIndex};

    fn knowledge() -> KnowledgeIndex {
        let index = VectorIndex::build(vec![vec![1.0, 0.0]]).unwrap();
        let metadata: MetadataStore =
            [MetadataRecord::new("Intro | Overview", "abcdefghij")].into_iter().collect();
        KnowledgeIndex::from_parts(index, metadata).unwrap()
    }

    #[test]
    fn test_listing_full_content() {
        assert_eq!(
            chunk_listing(&knowledge(), None),
            "Chunk 1: Intro | Overview\nabcdefghij\n\n"
        );
    }

    #[test]
    fn test_listing_preview() {
        let listing = chunk_listing(&knowledge(), Some(4));
        assert!(listing.contains("abcd..."));
        assert!(!listing.contains("abcdefghij"));
    }
}
