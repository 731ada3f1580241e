// In-process passage store with exact cosine search
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::errors::{RagError, Result};
use crate::store::{cosine_distance, Passage, PassageId, PassageStore, ScoredPassage};

/// Exact nearest-neighbor store kept in memory; ids are sequence numbers
pub struct MemoryPassageStore {
    passages: RwLock<Vec<Passage>>,
    next_id: AtomicU64,
    dimension: usize,
}

impl MemoryPassageStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            passages: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            dimension,
        }
    }

    /// Snapshot of every stored passage, in insertion order
    pub async fn passages(&self) -> Vec<Passage> {
        self.passages.read().await.clone()
    }

    /// Stored contents, in insertion order
    pub async fn contents(&self) -> Vec<String> {
        self.passages
            .read()
            .await
            .iter()
            .map(|p| p.content.clone())
            .collect()
    }
}

#[async_trait]
impl PassageStore for MemoryPassageStore {
    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<PassageId> {
        if embedding.len() != self.dimension {
            return Err(RagError::Persistence(format!(
                "embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimension
            )));
        }

        let id = PassageId(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        self.passages.write().await.push(Passage {
            id: id.clone(),
            content: content.to_string(),
            embedding: embedding.to_vec(),
        });
        Ok(id)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        if query.len() != self.dimension {
            return Err(RagError::Retrieval(format!(
                "query has {} dimensions, store expects {}",
                query.len(),
                self.dimension
            )));
        }

        let passages = self.passages.read().await;
        let mut scored: Vec<ScoredPassage> = passages
            .iter()
            .map(|p| ScoredPassage {
                id: p.id.clone(),
                content: p.content.clone(),
                distance: cosine_distance(query, &p.embedding),
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.passages.read().await.len() as u64)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
