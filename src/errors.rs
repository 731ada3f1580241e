//! Error types for the concierge RAG core
//!
//! Every failure is tagged with the stage that produced it so the transport
//! layer can tell caller mistakes apart from failing dependencies.

use serde::Serialize;
use thiserror::Error;

/// Main error type for ingestion and question answering
#[derive(Error, Debug)]
pub enum RagError {
    /// Document could not be read or is of an unsupported type
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Embedding provider call failed
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Passage store write failed
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Passage store query failed
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Completion provider call failed
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Caller supplied invalid input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingestion stopped part-way; earlier chunks remain stored
    #[error("Ingestion stopped at chunk {failed_chunk} of {total} ({stored} stored): {cause}")]
    PartialIngest {
        stored: usize,
        failed_chunk: usize,
        total: usize,
        stored_chunks: Vec<usize>,
        #[source]
        cause: Box<RagError>,
    },
}

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Stage tag attached to every [`RagError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Extraction,
    Embedding,
    Persistence,
    Retrieval,
    Generation,
    Input,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction_error",
            Self::Embedding => "embedding_error",
            Self::Persistence => "persistence_error",
            Self::Retrieval => "retrieval_error",
            Self::Generation => "generation_error",
            Self::Input => "input_error",
            Self::Config => "config_error",
        }
    }
}

impl RagError {
    /// Stage that produced this error. Partial ingestion reports its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Embedding(_) => ErrorKind::Embedding,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Retrieval(_) => ErrorKind::Retrieval,
            Self::Generation(_) => ErrorKind::Generation,
            Self::Input(_) => ErrorKind::Input,
            Self::Config(_) => ErrorKind::Config,
            Self::PartialIngest { cause, .. } => cause.kind(),
        }
    }

    /// True when the caller is at fault (bad input or unreadable document)
    pub fn is_client_fault(&self) -> bool {
        matches!(self.kind(), ErrorKind::Input | ErrorKind::Extraction)
    }

    /// Number of passages durably stored before the failure, if any were attempted
    pub fn passages_stored(&self) -> usize {
        match self {
            Self::PartialIngest { stored, .. } => *stored,
            _ => 0,
        }
    }
}
