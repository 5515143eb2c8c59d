// Vector index module
// Handles index state detection, the index manifest, and LanceDB storage

#[cfg(test)]
mod tests;

pub mod vector_store;

pub use vector_store::{SearchResult, VectorStore};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File written next to the index data, recording how it was built
pub const MANIFEST_FILE: &str = "manifest.toml";

/// Whether a usable index already exists at the persistence location.
/// Resolved once, before any index I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// No index yet; build from the documents directory
    Fresh,
    /// A previously built index is present; load it
    Existing,
}

impl IndexState {
    /// Detect the index state from the persistence directory. Only a
    /// directory containing a manifest counts as an existing index; anything
    /// else (missing directory, stale partial data) means a fresh build.
    #[inline]
    pub fn detect(index_dir: &Path) -> Self {
        if index_dir.join(MANIFEST_FILE).is_file() {
            Self::Existing
        } else {
            Self::Fresh
        }
    }
}

/// Build-time facts about the index, validated when the index is reopened
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    /// Embedding model the index was built with; queries must use the same
    /// model for vectors to be comparable
    pub embedding_model: String,
    /// Vector dimension of every entry
    pub dimension: usize,
    /// Number of entries written at build time
    pub entry_count: usize,
    /// RFC 3339 build timestamp
    pub created_at: String,
}

impl IndexManifest {
    #[inline]
    pub fn write(&self, index_dir: &Path) -> Result<()> {
        let path = index_dir.join(MANIFEST_FILE);
        let content = toml::to_string_pretty(self).context("Failed to serialize index manifest")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write index manifest: {}", path.display()))?;
        Ok(())
    }

    #[inline]
    pub fn read(index_dir: &Path) -> Result<Self> {
        let path = index_dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read index manifest: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse index manifest: {}", path.display()))
    }
}

/// A chunk embedding persisted in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this entry
    pub id: String,
    /// The embedding vector
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata stored alongside each embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Path of the source file
    pub source: String,
    /// 1-based page number for PDF-derived chunks
    pub page: Option<u32>,
    /// Index of the chunk within its source document
    pub chunk_index: u32,
    /// The chunk text
    pub content: String,
    /// Timestamp when this entry was created
    pub created_at: String,
}
