//! SQLite persistence for the index/metadata pair.
//!
//! One file, two tables, written in a single transaction:
//! - `meta(key, value)`: dimensions, count, format version, embedding model,
//!   document fingerprint, build time
//! - `entries(position, heading, content, vector)`: one row per chunk, the
//!   vector stored as little-endian `f32` bytes
//!
//! Vectors are persisted already normalized and read back bit-for-bit, so a
//! reloaded index ranks exactly like the one that was saved.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use docqa_core::error::{DocQaError, Result};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::index::VectorIndex;
use crate::metadata::{MetadataRecord, MetadataStore};
use crate::pipeline::KnowledgeIndex;

const FORMAT_VERSION: &str = "1";

/// Build provenance stored next to the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub embedding_model: String,
    pub dimensions: usize,
    pub count: usize,
    pub document_fingerprint: Option<String>,
    pub built_at: DateTime<Utc>,
}

impl IndexInfo {
    pub fn new(knowledge: &KnowledgeIndex, embedding_model: &str, fingerprint: Option<String>) -> Self {
        Self {
            embedding_model: embedding_model.to_string(),
            dimensions: knowledge.dimensions(),
            count: knowledge.len(),
            document_fingerprint: fingerprint,
            built_at: Utc::now(),
        }
    }
}

pub struct IndexStore;

fn storage(e: rusqlite::Error) -> DocQaError {
    DocQaError::Storage(e.to_string())
}

fn corrupt(e: rusqlite::Error) -> DocQaError {
    DocQaError::CorruptIndex(e.to_string())
}

impl IndexStore {
    /// Write the pair to `path`, replacing any previous contents.
    pub fn save(path: &Path, knowledge: &KnowledgeIndex, info: &IndexInfo) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(path).map_err(storage)?;
        let tx = conn.transaction().map_err(storage)?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS meta;
             DROP TABLE IF EXISTS entries;
             CREATE TABLE meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
             );
             CREATE TABLE entries (
                position INTEGER PRIMARY KEY,
                heading TEXT NOT NULL,
                content TEXT NOT NULL,
                vector BLOB NOT NULL
             );",
        )
        .map_err(storage)?;

        {
            let mut meta = tx
                .prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")
                .map_err(storage)?;
            let mut pairs = vec![
                ("format_version", FORMAT_VERSION.to_string()),
                ("dimensions", knowledge.dimensions().to_string()),
                ("count", knowledge.len().to_string()),
                ("embedding_model", info.embedding_model.clone()),
                ("built_at", info.built_at.to_rfc3339()),
            ];
            if let Some(fingerprint) = &info.document_fingerprint {
                pairs.push(("document_fingerprint", fingerprint.clone()));
            }
            for (key, value) in pairs {
                meta.execute(rusqlite::params![key, value]).map_err(storage)?;
            }

            let mut entries = tx
                .prepare(
                    "INSERT INTO entries (position, heading, content, vector)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(storage)?;
            for (position, (vector, record)) in knowledge
                .index()
                .vectors()
                .zip(knowledge.metadata().iter())
                .enumerate()
            {
                entries
                    .execute(rusqlite::params![
                        position as i64,
                        record.heading,
                        record.content,
                        encode_vector(vector),
                    ])
                    .map_err(storage)?;
            }
        }

        tx.commit().map_err(storage)?;
        tracing::info!("💾 Saved {} chunks to {}", knowledge.len(), path.display());
        Ok(())
    }

    /// Read the pair back, validating that it is internally consistent.
    pub fn load(path: &Path) -> Result<(KnowledgeIndex, IndexInfo)> {
        if !path.exists() {
            return Err(DocQaError::Storage(format!(
                "index file not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(storage)?;

        let meta = read_meta(&conn)?;
        let version = required(&meta, "format_version")?;
        if version != FORMAT_VERSION {
            return Err(DocQaError::CorruptIndex(format!(
                "unsupported format version {version}"
            )));
        }
        let dimensions = parse_usize(&meta, "dimensions")?;
        let count = parse_usize(&meta, "count")?;
        let vector_bytes = dimensions.checked_mul(4).ok_or_else(|| {
            DocQaError::CorruptIndex(format!("dimensions {dimensions} out of range"))
        })?;
        let built_at = DateTime::parse_from_rfc3339(required(&meta, "built_at")?)
            .map_err(|e| DocQaError::CorruptIndex(format!("built_at: {e}")))?
            .with_timezone(&Utc);

        let mut stmt = conn
            .prepare("SELECT position, heading, content, vector FROM entries ORDER BY position")
            .map_err(corrupt)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(corrupt)?;

        let mut data = Vec::new();
        let mut metadata = MetadataStore::new();
        for (expected, row) in rows.enumerate() {
            let (position, heading, content, blob) = row.map_err(corrupt)?;
            if position != expected as i64 {
                return Err(DocQaError::CorruptIndex(format!(
                    "expected position {expected}, found {position}"
                )));
            }
            if blob.len() != vector_bytes {
                return Err(DocQaError::CorruptIndex(format!(
                    "vector at position {position} has {} bytes, expected {vector_bytes}",
                    blob.len(),
                )));
            }
            data.extend(decode_vector(&blob));
            metadata.append(MetadataRecord { heading, content });
        }

        if metadata.len() != count {
            return Err(DocQaError::CorruptIndex(format!(
                "meta says {count} entries, found {}",
                metadata.len()
            )));
        }

        let knowledge =
            KnowledgeIndex::from_parts(VectorIndex::from_unit_vectors(dimensions, data)?, metadata)?;
        let info = IndexInfo {
            embedding_model: required(&meta, "embedding_model")?.to_string(),
            dimensions,
            count,
            document_fingerprint: meta.get("document_fingerprint").cloned(),
            built_at,
        };
        tracing::info!(
            "📂 Loaded {} chunks from {} (model {})",
            count,
            path.display(),
            info.embedding_model
        );
        Ok((knowledge, info))
    }

    /// SHA-256 of a source document, hex encoded.
    pub fn fingerprint(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

fn read_meta(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM meta").map_err(corrupt)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(corrupt)?;
    let meta = rows
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(corrupt)?;
    Ok(meta)
}

fn required<'a>(meta: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    meta.get(key)
        .map(String::as_str)
        .ok_or_else(|| DocQaError::CorruptIndex(format!("missing meta key '{key}'")))
}

fn parse_usize(meta: &HashMap<String, String>, key: &str) -> Result<usize> {
    required(meta, key)?
        .parse()
        .map_err(|e| DocQaError::CorruptIndex(format!("{key}: {e}")))
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> impl Iterator<Item = f32> + '_ {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RetrievalPipeline;
    use crate::testing::{KeywordEmbedder, scenario};
    use std::sync::Arc;

    async fn built() -> (RetrievalPipeline, KnowledgeIndex) {
        let pipeline = RetrievalPipeline::new(Arc::new(KeywordEmbedder::default()));
        let knowledge = pipeline.build(&scenario()).await.unwrap();
        (pipeline, knowledge)
    }

    #[tokio::test]
    async fn test_round_trip_preserves_search() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");
        let (pipeline, knowledge) = built().await;
        let info = IndexInfo::new(&knowledge, "keyword-v1", Some("abc".into()));

        IndexStore::save(&path, &knowledge, &info).unwrap();
        let (loaded, loaded_info) = IndexStore::load(&path).unwrap();

        assert_eq!(loaded, knowledge);
        assert_eq!(loaded_info.count, 2);
        assert_eq!(loaded_info.embedding_model, "keyword-v1");
        assert_eq!(loaded_info.document_fingerprint.as_deref(), Some("abc"));

        for question in ["Overview", "Details body", "install"] {
            let before = pipeline.retrieve(&knowledge, question, 2).await.unwrap();
            let after = pipeline.retrieve(&loaded, question, 2).await.unwrap();
            assert_eq!(before.len(), after.len());
            for (a, b) in before.iter().zip(&after) {
                assert_eq!(a.position, b.position);
                assert_eq!(a.record, b.record);
                assert!((a.score - b.score).abs() < 1e-6);
            }
        }
    }

    #[tokio::test]
    async fn test_save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let (_, knowledge) = built().await;

        IndexStore::save(&path, &knowledge, &IndexInfo::new(&knowledge, "m1", None)).unwrap();
        let empty = KnowledgeIndex::default();
        IndexStore::save(&path, &empty, &IndexInfo::new(&empty, "m2", None)).unwrap();

        let (loaded, info) = IndexStore::load(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(info.embedding_model, "m2");
        assert_eq!(info.document_fingerprint, None);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let (_, knowledge) = built().await;
        IndexStore::save(&path, &knowledge, &IndexInfo::new(&knowledge, "m", None)).unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM entries WHERE position = 1", []).unwrap();
        drop(conn);

        let err = IndexStore::load(&path).unwrap_err();
        assert!(matches!(err, DocQaError::CorruptIndex(_)), "{err}");
    }

    #[tokio::test]
    async fn test_truncated_vector_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let (_, knowledge) = built().await;
        IndexStore::save(&path, &knowledge, &IndexInfo::new(&knowledge, "m", None)).unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE entries SET vector = x'0000' WHERE position = 0", [])
            .unwrap();
        drop(conn);

        assert!(matches!(
            IndexStore::load(&path),
            Err(DocQaError::CorruptIndex(_))
        ));
    }

    #[tokio::test]
    async fn test_huge_dimensions_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let (_, knowledge) = built().await;
        IndexStore::save(&path, &knowledge, &IndexInfo::new(&knowledge, "m", None)).unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "UPDATE meta SET value = ?1 WHERE key = 'dimensions'",
            [usize::MAX.to_string()],
        )
        .unwrap();
        drop(conn);

        let err = IndexStore::load(&path).unwrap_err();
        assert!(matches!(err, DocQaError::CorruptIndex(_)), "{err}");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexStore::load(&dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, DocQaError::Storage(_)));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "H1: Intro").unwrap();
        let first = IndexStore::fingerprint(&path).unwrap();
        assert_eq!(first.len(), 64);
        std::fs::write(&path, "H1: Intro!").unwrap();
        assert_ne!(IndexStore::fingerprint(&path).unwrap(), first);
    }

    #[test]
    fn test_vector_bytes_are_exact() {
        let v = [0.1f32, -2.5, f32::MIN_POSITIVE];
        let decoded: Vec<f32> = decode_vector(&encode_vector(&v)).collect();
        assert_eq!(decoded, v);
    }
}
