// Qdrant-backed passage store
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, CountPointsBuilder, CreateCollectionBuilder, Distance,
    PointId, PointStruct, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{RagError, Result};
use crate::store::{PassageId, PassageStore, ScoredPassage};

const CONTENT_KEY: &str = "content";

/// Passage store on a Qdrant collection with cosine distance
pub struct QdrantPassageStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantPassageStore {
    /// Connect and make sure the collection exists
    pub async fn connect(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to create Qdrant client: {}", e)))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };
        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| RagError::Config(format!("Failed to list Qdrant collections: {}", e)))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| {
                    RagError::Config(format!(
                        "Failed to create collection {}: {}",
                        self.collection, e
                    ))
                })?;
            tracing::info!(collection = %self.collection, dimension = self.dimension, "created passage collection");
        }

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl PassageStore for QdrantPassageStore {
    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<PassageId> {
        if embedding.len() != self.dimension {
            return Err(RagError::Persistence(format!(
                "embedding has {} dimensions, collection expects {}",
                embedding.len(),
                self.dimension
            )));
        }

        let id = Uuid::new_v4().to_string();
        let mut payload = HashMap::new();
        payload.insert(CONTENT_KEY.to_string(), QdrantValue::from(content.to_string()));

        let point = PointStruct::new(id.clone(), embedding.to_vec(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| RagError::Persistence(format!("Failed to upsert passage: {}", e)))?;

        Ok(PassageId(id))
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::Retrieval(format!(
                "query has {} dimensions, collection expects {}",
                query.len(),
                self.dimension
            )));
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to search passages: {}", e)))?;

        Ok(response.result.iter().filter_map(scored_passage).collect())
    }

    async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to count passages: {}", e)))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Converts a hit to a passage; points without a string `content` payload are skipped
fn scored_passage(point: &ScoredPoint) -> Option<ScoredPassage> {
    let id = point_id_to_string(&point.id);
    let Some(content) = point.payload.get(CONTENT_KEY).and_then(qdrant_value_to_string) else {
        tracing::warn!(id = %id, "skipping point without passage content");
        return None;
    };

    // Qdrant reports cosine similarity, highest first
    Some(ScoredPassage {
        id: PassageId(id),
        content,
        distance: 1.0 - point.score,
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

fn point_id_to_string(point_id: &Option<PointId>) -> String {
    match point_id.as_ref().and_then(|id| id.point_id_options.as_ref()) {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u.clone(),
        None => "unknown".to_string(),
    }
}
