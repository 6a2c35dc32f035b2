//! Positional metadata store. Entry `i` describes index vector `i`.

use docqa_core::error::{DocQaError, Result};
use serde::{Deserialize, Serialize};

/// What a caller gets back for a retrieved position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub heading: String,
    pub content: String,
}

impl MetadataRecord {
    pub fn new(heading: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            content: content.into(),
        }
    }

    /// First `max_chars` characters of the content, for logs and listings.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<MetadataRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, returning its position.
    pub fn append(&mut self, record: MetadataRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn get(&self, position: usize) -> Result<&MetadataRecord> {
        self.records.get(position).ok_or(DocQaError::OutOfRange {
            position,
            size: self.records.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.iter()
    }
}

impl FromIterator<MetadataRecord> for MetadataStore {
    fn from_iter<I: IntoIterator<Item = MetadataRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
