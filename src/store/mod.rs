//! Passage storage and nearest-neighbor search
//!
//! Passages are insert-only: a store assigns the id, never updates a row,
//! and answers `search` ordered by ascending cosine distance.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{StoreConfig, StoreKind};
use crate::errors::Result;

pub use memory::MemoryPassageStore;
pub use qdrant::QdrantPassageStore;

/// Store-assigned passage identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassageId(pub String);

impl fmt::Display for PassageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored passage with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Search hit; `distance` is cosine distance (0 = same direction)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: PassageId,
    pub content: String,
    pub distance: f32,
}

/// Durable (content, embedding) storage with cosine nearest-neighbor search
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// Persist a passage and return its new id
    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<PassageId>;

    /// Up to `k` passages closest to `query`, nearest first
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>>;

    /// Number of stored passages
    async fn count(&self) -> Result<u64>;

    /// Vector dimension accepted by this store
    fn dimension(&self) -> usize;
}

/// Cosine distance, `1 - cos(a, b)`. Zero vectors are treated as maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Open the store named in the configuration
pub async fn from_config(config: &StoreConfig, dimension: usize) -> Result<Arc<dyn PassageStore>> {
    let store: Arc<dyn PassageStore> = match config.kind {
        StoreKind::Qdrant => Arc::new(
            QdrantPassageStore::connect(&config.url, &config.collection, dimension).await?,
        ),
        StoreKind::Memory => Arc::new(MemoryPassageStore::new(dimension)),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_distance_identical_is_zero() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal_is_one() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_opposite_is_two() {
        let d = cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_passage_id_display() {
        assert_eq!(PassageId("42".to_string()).to_string(), "42");
    }
}
