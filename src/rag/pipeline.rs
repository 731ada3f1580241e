// End-to-end RAG pipeline: ingest documents, answer questions
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chunking::{Chunker, ChunkerConfig};
use crate::config::Config;
use crate::errors::{RagError, Result};
use crate::extraction::{DocumentExtractor, DocumentSource, TextExtractor};
use crate::providers::{self, EmbeddingClient, GenerationClient};
use crate::rag::context::QueryContext;
use crate::rag::ingestion::{IngestReport, IngestionPipeline};
use crate::rag::retrieval::{RetrievalEngine, SearchParams};
use crate::rag::synthesis::AnswerSynthesizer;
use crate::store::{self, PassageStore};

pub const HEALTH_STATUS: &str = "RAG service is running";

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub chunking: ChunkerConfig,
    pub search: SearchParams,
    /// Chunks embedded and stored at once during ingestion
    pub concurrency: usize,
    /// Property named in the concierge instruction
    pub property_name: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkerConfig::default(),
            search: SearchParams::default(),
            concurrency: 1,
            property_name: "Oasis Hotel".to_string(),
        }
    }
}

impl From<&Config> for RagConfig {
    fn from(config: &Config) -> Self {
        Self {
            chunking: config.chunking.clone(),
            search: SearchParams {
                top_k: config.retrieval.top_k,
            },
            concurrency: config.ingestion.concurrency,
            property_name: config.prompt.property_name.clone(),
        }
    }
}

/// An answer together with the passages it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub context: QueryContext,
}

/// Ingest, Answer and Health entry points over shared providers and store
pub struct RagPipeline {
    ingestion: IngestionPipeline,
    retrieval: RetrievalEngine,
    synthesizer: AnswerSynthesizer,
    store: Arc<dyn PassageStore>,
    config: RagConfig,
}

impl RagPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingClient>,
        generator: Arc<dyn GenerationClient>,
        store: Arc<dyn PassageStore>,
        config: RagConfig,
    ) -> Self {
        let ingestion = IngestionPipeline::new(
            extractor,
            Chunker::with_config(config.chunking.clone()),
            embedder.clone(),
            store.clone(),
        )
        .with_concurrency(config.concurrency);
        let retrieval = RetrievalEngine::with_params(embedder, store.clone(), config.search.clone());
        let synthesizer = AnswerSynthesizer::new(generator, config.property_name.clone());

        Self {
            ingestion,
            retrieval,
            synthesizer,
            store,
            config,
        }
    }

    /// Build providers and store from configuration.
    ///
    /// The store is opened with the embedding client's dimension.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let (embedder, generator) = providers::from_config(&config.providers)?;
        let store = store::from_config(&config.store, embedder.dimension()).await?;

        tracing::info!(
            provider = embedder.name(),
            model = generator.model(),
            dimension = embedder.dimension(),
            "pipeline ready"
        );

        Ok(Self::new(
            Arc::new(DocumentExtractor::new()),
            embedder,
            generator,
            store,
            RagConfig::from(config),
        ))
    }

    /// Ingest one document; see [`IngestionPipeline::ingest`]
    pub async fn ingest(&self, source: &DocumentSource) -> Result<IngestReport> {
        self.ingestion.ingest(source).await
    }

    /// Answer a guest question from stored passages
    pub async fn answer(&self, question: &str) -> Result<String> {
        Ok(self.ask(question).await?.answer)
    }

    /// Like [`answer`](Self::answer), also returning the retrieved context
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Input("question must not be empty".to_string()));
        }

        let context = self.retrieval.retrieve_default(question).await?;
        tracing::info!(passages = context.len(), "answering question");

        let answer = self.synthesizer.synthesize(question, &context).await?;
        Ok(Answer { answer, context })
    }

    /// Liveness only; dependencies are not probed
    pub fn health(&self) -> Result<String> {
        Ok(HEALTH_STATUS.to_string())
    }

    /// Number of stored passages
    pub async fn passage_count(&self) -> Result<u64> {
        self.store.count().await
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }
}
