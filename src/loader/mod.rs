// Document loading module
// Reads a flat directory of .txt and .pdf files into Document records


use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::QaError;

/// A loaded document ready for chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Full text content
    pub content: String,
    /// Source metadata carried through chunking into the index
    pub metadata: DocumentMetadata,
}

/// Source metadata attached to a document and copied to every derived chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Path of the file this document came from
    pub source: PathBuf,
    /// 1-based page number for PDF pages; None for plain text files
    pub page: Option<u32>,
}

type ParserFn = fn(&Path) -> Result<Vec<Document>>;

/// Extension registry mapping lowercase file extensions to parsers
const PARSERS: &[(&str, ParserFn)] = &[("txt", parse_text), ("pdf", parse_pdf)];

fn parser_for(extension: &str) -> Option<ParserFn> {
    PARSERS
        .iter()
        .find(|(ext, _)| extension.eq_ignore_ascii_case(ext))
        .map(|(_, parser)| *parser)
}

/// Load all supported documents from a directory
///
/// Entries are visited in file name order. Files with unsupported extensions
/// and subdirectories are skipped with a diagnostic; a missing or unreadable
/// directory is a fatal error.
#[inline]
pub fn load_documents(docs_dir: &Path) -> Result<Vec<Document>, QaError> {
    let entries = fs::read_dir(docs_dir).map_err(|e| {
        QaError::Loader(format!(
            "Failed to read docs directory {}: {}",
            docs_dir.display(),
            e
        ))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| {
            QaError::Loader(format!(
                "Failed to list docs directory {}: {}",
                docs_dir.display(),
                e
            ))
        })?;
    paths.sort();

    let mut documents = Vec::new();

    for path in paths {
        if !path.is_file() {
            warn!("Skipped {} (not a file)", path.display());
            continue;
        }

        let extension = path.extension().and_then(OsStr::to_str).unwrap_or_default();

        match parser_for(extension) {
            Some(parser) => {
                let parsed = parser(&path).map_err(|e| {
                    QaError::Loader(format!("Failed to load {}: {:#}", path.display(), e))
                })?;
                info!("Loaded: {} ({} documents)", path.display(), parsed.len());
                documents.extend(parsed);
            }
            None => {
                warn!("Skipped: {} (unsupported format)", path.display());
            }
        }
    }

    info!(
        "Total documents loaded from {}: {}",
        docs_dir.display(),
        documents.len()
    );
    Ok(documents)
}

/// Parse a plain text file into a single document
fn parse_text(path: &Path) -> Result<Vec<Document>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read text file: {}", path.display()))?;

    Ok(vec![Document {
        content,
        metadata: DocumentMetadata {
            source: path.to_path_buf(),
            page: None,
        },
    }])
}

/// Parse a PDF file into one document per page
fn parse_pdf(path: &Path) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path)
        .with_context(|| format!("Failed to open PDF: {}", path.display()))?;

    let mut documents = Vec::new();

    for page_number in pdf.get_pages().keys() {
        let content = pdf.extract_text(&[*page_number]).with_context(|| {
            format!(
                "Failed to extract text from page {} of {}",
                page_number,
                path.display()
            )
        })?;

        debug!(
            "Extracted page {} of {} ({} characters)",
            page_number,
            path.display(),
            content.chars().count()
        );

        documents.push(Document {
            content,
            metadata: DocumentMetadata {
                source: path.to_path_buf(),
                page: Some(*page_number),
            },
        });
    }

    Ok(documents)
}
