//! Concierge - document-grounded question answering
//!
//! Ingests a property's policy documents into a vector store and answers
//! guest questions from the most relevant passages.
//!
//! # Architecture
//!
//! - **Ingest**: extraction -> chunking -> embedding -> passage store
//! - **Answer**: embedding -> nearest passages -> grounded completion
//! - **Transport**: axum HTTP API and a clap CLI over the same pipeline

pub mod errors;
pub mod config;

pub mod chunking;
pub mod extraction;
pub mod providers;
pub mod store;

pub mod rag;

pub mod server;
pub mod cli;

// Re-export commonly used types
pub use errors::{ErrorKind, RagError, Result};
pub use rag::{Answer, IngestReport, RagPipeline};
