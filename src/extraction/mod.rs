//! Text extraction
//!
//! Turns an uploaded or on-disk document into one plain-text string.
//! PDF parsing runs on the blocking pool; a panic inside the PDF library is
//! reported as an extraction failure instead of taking the worker down.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::errors::{RagError, Result};

const PAGE_SEPARATOR: &str = "\n\n";

/// Where a document comes from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// File on local disk
    Path(PathBuf),
    /// In-memory upload with its original file name
    Bytes { file_name: String, data: Bytes },
}

impl DocumentSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Bytes {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// Display name used in logs and reports
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    fn extension(&self) -> Option<String> {
        let name = match self {
            Self::Path(path) => path.to_string_lossy().into_owned(),
            Self::Bytes { file_name, .. } => file_name.clone(),
        };
        Path::new(&name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    async fn read(&self) -> Result<Bytes> {
        match self {
            Self::Path(path) => tokio::fs::read(path).await.map(Bytes::from).map_err(|e| {
                RagError::Extraction(format!("Failed to read {}: {}", path.display(), e))
            }),
            Self::Bytes { data, .. } => Ok(data.clone()),
        }
    }
}

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Converts a raw document into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, source: &DocumentSource) -> Result<String>;
}

/// Extension-dispatching extractor for PDF and plain-text documents
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Page texts joined with a blank line
    fn extract_pdf(name: &str, data: &[u8]) -> Result<String> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(data)
            .map_err(|e| RagError::Extraction(format!("Failed to read PDF {}: {}", name, e)))?;
        Ok(pages.join(PAGE_SEPARATOR))
    }

    fn extract_plain(name: &str, data: &[u8]) -> Result<String> {
        String::from_utf8(data.to_vec())
            .map_err(|_| RagError::Extraction(format!("{} is not valid UTF-8 text", name)))
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, source: &DocumentSource) -> Result<String> {
        let name = source.name();
        let format = source
            .extension()
            .as_deref()
            .and_then(DocumentFormat::from_extension)
            .ok_or_else(|| {
                RagError::Extraction(format!("Unsupported document type: {}", name))
            })?;

        let data = source.read().await?;
        if data.is_empty() {
            return Err(RagError::Extraction(format!("{} is empty", name)));
        }

        let text = match format {
            DocumentFormat::PlainText => Self::extract_plain(&name, &data)?,
            DocumentFormat::Pdf => {
                let pdf_name = name.clone();
                tokio::task::spawn_blocking(move || Self::extract_pdf(&pdf_name, &data))
                    .await
                    .map_err(|e| {
                        RagError::Extraction(format!("PDF parser crashed on {}: {}", name, e))
                    })??
            }
        };

        tracing::debug!(document = %name, chars = text.chars().count(), "extracted text");
        Ok(text)
    }
}
