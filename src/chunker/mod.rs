// Chunking module
// Splits documents into overlapping, retrieval-sized text chunks


use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::loader::{Document, DocumentMetadata};

/// Separator cascade, highest priority first: paragraph break, line break,
/// sentence end, word space. Text still oversized after the last separator
/// falls back to fixed-width character windows.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Configuration for document chunking; both sizes are character counts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target maximum chunk length
    pub chunk_size: usize,
    /// Maximum number of trailing characters shared with the next chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// A chunk of document text, carrying its parent document's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    /// Copied unchanged from the parent document
    pub metadata: DocumentMetadata,
    /// Position of this chunk within its parent document
    pub chunk_index: u32,
}

/// Split documents into chunks, copying each document's metadata to every
/// chunk derived from it
#[inline]
pub fn chunk_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for document in documents {
        let pieces = split_text(&document.content, SEPARATORS, config);
        for (index, content) in pieces.into_iter().enumerate() {
            chunks.push(Chunk {
                content,
                metadata: document.metadata.clone(),
                chunk_index: index as u32,
            });
        }
    }

    debug!(
        "Chunked {} documents into {} chunks",
        documents.len(),
        chunks.len()
    );
    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Recursively split text, preferring the highest-priority separator that
/// keeps pieces within the size bound
fn split_text(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    // A text that already fits is returned whole, untouched
    if char_len(text) <= config.chunk_size {
        return vec![text.to_string()];
    }

    let Some((separator, remaining)) = separators.split_first() else {
        return char_windows(text, config);
    };

    if !text.contains(separator) {
        return split_text(text, remaining, config);
    }

    let splits: Vec<&str> = text.split(separator).collect();

    let mut result = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for split in splits {
        if char_len(split) <= config.chunk_size {
            fitting.push(split);
        } else {
            // Flush accumulated small pieces, then descend into the
            // oversized one with the lower-priority separators
            if !fitting.is_empty() {
                result.extend(merge_splits(&fitting, separator, config));
                fitting.clear();
            }
            result.extend(split_text(split, remaining, config));
        }
    }

    if !fitting.is_empty() {
        result.extend(merge_splits(&fitting, separator, config));
    }

    result
}

/// Greedily merge adjacent pieces into chunks up to the size bound, carrying
/// at most `chunk_overlap` trailing characters into the next chunk
fn merge_splits(splits: &[&str], separator: &str, config: &ChunkingConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for split in splits {
        let len = char_len(split);
        let added_sep = if window.is_empty() { 0 } else { sep_len };

        if total + len + added_sep > config.chunk_size && !window.is_empty() {
            if let Some(chunk) = join_window(&window, separator) {
                chunks.push(chunk);
            }

            // Shrink the window until it fits inside the overlap allowance
            // and leaves room for the incoming piece
            while total > config.chunk_overlap
                || (total + len + if window.is_empty() { 0 } else { sep_len } > config.chunk_size
                    && total > 0)
            {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
            }
        }

        total += len + if window.is_empty() { 0 } else { sep_len };
        window.push_back(split);
    }

    if let Some(chunk) = join_window(&window, separator) {
        chunks.push(chunk);
    }

    chunks
}

fn join_window(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let mut joined = String::new();
    for (i, part) in window.iter().enumerate() {
        if i > 0 {
            joined.push_str(separator);
        }
        joined.push_str(part);
    }

    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Last-resort splitting into fixed-width character windows
fn char_windows(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}
