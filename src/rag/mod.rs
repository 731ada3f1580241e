//! Retrieval-augmented question answering
//!
//! Components:
//! - Ingestion: extract, chunk, embed and store documents
//! - Retrieval Engine: nearest passages for a question
//! - Context Builder: grounded concierge instruction
//! - Synthesis: one completion per question
//! - Pipeline: the Ingest / Answer / Health entry points

pub mod context;
pub mod ingestion;
pub mod pipeline;
pub mod retrieval;
pub mod synthesis;

pub use context::{ContextBuilder, QueryContext, RetrievedPassage};
pub use ingestion::{IngestReport, IngestionPipeline};
pub use pipeline::{Answer, RagConfig, RagPipeline, HEALTH_STATUS};
pub use retrieval::{RetrievalEngine, SearchParams};
pub use synthesis::AnswerSynthesizer;
