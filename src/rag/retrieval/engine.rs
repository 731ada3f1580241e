// Retrieval engine: question -> nearest stored passages
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{RagError, Result};
use crate::providers::EmbeddingClient;
use crate::rag::context::{QueryContext, RetrievedPassage};
use crate::store::PassageStore;

pub const DEFAULT_TOP_K: usize = 3;

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of passages to retrieve
    pub top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Embeds a question and pulls the closest passages from the store
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn PassageStore>,
    default_params: SearchParams,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn PassageStore>) -> Self {
        Self::with_params(embedder, store, SearchParams::default())
    }

    pub fn with_params(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn PassageStore>,
        params: SearchParams,
    ) -> Self {
        Self {
            embedder,
            store,
            default_params: params,
        }
    }

    /// Retrieve with the default `top_k`
    pub async fn retrieve_default(&self, question: &str) -> Result<QueryContext> {
        self.retrieve(question, self.default_params.top_k).await
    }

    /// At most `k` passages, ascending cosine distance to the question.
    ///
    /// An empty store gives an empty context, not an error.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<QueryContext> {
        if k == 0 {
            return Ok(QueryContext::empty());
        }

        let query = self.embedder.embed(question).await.map_err(|e| match e {
            RagError::Embedding(_) => e,
            other => RagError::Embedding(other.to_string()),
        })?;

        let mut hits = self.store.search(&query, k).await.map_err(|e| match e {
            RagError::Retrieval(_) => e,
            other => RagError::Retrieval(other.to_string()),
        })?;

        // Stores are trusted to order by distance, but the bound and order hold either way
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        tracing::debug!(k, retrieved = hits.len(), "retrieved passages");

        Ok(QueryContext::new(
            hits.into_iter().map(RetrievedPassage::from).collect(),
        ))
    }

    pub fn default_params(&self) -> &SearchParams {
        &self.default_params
    }

    pub fn set_default_params(&mut self, params: SearchParams) {
        self.default_params = params;
    }
}
