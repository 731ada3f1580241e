// Chunking: normalized text → length-bounded passages

pub mod chunker;

pub use chunker::{normalize, Chunker, ChunkerConfig};
