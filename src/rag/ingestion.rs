// Ingestion pipeline: document -> text -> chunks -> embedded passages
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chunking::Chunker;
use crate::errors::{RagError, Result};
use crate::extraction::{DocumentSource, TextExtractor};
use crate::providers::EmbeddingClient;
use crate::store::{PassageId, PassageStore};

/// Outcome of a fully successful ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document: String,
    pub chunks_total: usize,
    pub passages_stored: usize,
    /// Ids in chunk order
    pub passage_ids: Vec<PassageId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Extracts, chunks, embeds and stores documents.
///
/// Not transactional: passages stored before a failure stay stored, and
/// ingesting the same document twice stores its passages twice.
pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn PassageStore>,
    concurrency: usize,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn PassageStore>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            embedder,
            store,
            concurrency: 1,
        }
    }

    /// Embed and store up to `concurrency` chunks at once (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Ingest one document.
    ///
    /// Extraction failures store nothing. A failure at chunk `i` returns
    /// [`RagError::PartialIngest`] carrying the embedding or persistence cause.
    pub async fn ingest(&self, source: &DocumentSource) -> Result<IngestReport> {
        let started_at = Utc::now();
        let document = source.name();

        let text = self.extractor.extract(source).await?;
        let chunks = self.chunker.chunk_document(&text);
        tracing::info!(
            document = %document,
            chars = text.chars().count(),
            chunks = chunks.len(),
            "extracted document"
        );

        let stored = if self.concurrency <= 1 {
            self.store_sequential(&chunks).await
        } else {
            self.store_concurrent(&chunks).await
        };
        let passage_ids = match stored {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    document = %document,
                    stored = e.passages_stored(),
                    error = %e,
                    "ingestion stopped"
                );
                return Err(e);
            }
        };

        let report = IngestReport {
            document,
            chunks_total: chunks.len(),
            passages_stored: passage_ids.len(),
            passage_ids,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            document = %report.document,
            passages = report.passages_stored,
            duration_ms = report.duration_ms(),
            "ingested document"
        );

        Ok(report)
    }

    async fn store_chunk(&self, index: usize, chunk: &str) -> Result<PassageId> {
        let embedding = self.embedder.embed(chunk).await.map_err(|e| match e {
            RagError::Embedding(_) => e,
            other => RagError::Embedding(other.to_string()),
        })?;

        let id = self.store.insert(chunk, &embedding).await.map_err(|e| match e {
            RagError::Persistence(_) => e,
            other => RagError::Persistence(other.to_string()),
        })?;

        tracing::debug!(chunk = index, id = %id, "stored passage");
        Ok(id)
    }

    async fn store_sequential(&self, chunks: &[String]) -> Result<Vec<PassageId>> {
        let mut ids = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            match self.store_chunk(index, chunk).await {
                Ok(id) => ids.push(id),
                Err(cause) => {
                    return Err(RagError::PartialIngest {
                        stored: ids.len(),
                        failed_chunk: index,
                        total: chunks.len(),
                        stored_chunks: (0..index).collect(),
                        cause: Box::new(cause),
                    })
                }
            }
        }
        Ok(ids)
    }

    async fn store_concurrent(&self, chunks: &[String]) -> Result<Vec<PassageId>> {
        let failed = AtomicBool::new(false);

        // After the first failure, chunks not yet started are skipped (None);
        // chunks already in flight run to completion. Futures are boxed up
        // front so the ingest future stays Send.
        let tasks: Vec<BoxFuture<'_, (usize, Option<Result<PassageId>>)>> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let failed = &failed;
                async move {
                    if failed.load(Ordering::SeqCst) {
                        return (index, None);
                    }
                    let result = self.store_chunk(index, chunk).await;
                    if result.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    (index, Some(result))
                }
                .boxed()
            })
            .collect();

        let mut outcomes: Vec<(usize, Option<Result<PassageId>>)> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);

        let mut ids = Vec::with_capacity(chunks.len());
        let mut stored_chunks = Vec::new();
        let mut first_failure: Option<(usize, RagError)> = None;

        for (index, outcome) in outcomes {
            match outcome {
                Some(Ok(id)) => {
                    stored_chunks.push(index);
                    ids.push(id);
                }
                Some(Err(cause)) if first_failure.is_none() => first_failure = Some((index, cause)),
                Some(Err(cause)) => {
                    tracing::debug!(chunk = index, error = %cause, "additional chunk failure");
                }
                None => {}
            }
        }

        match first_failure {
            None => Ok(ids),
            Some((failed_chunk, cause)) => Err(RagError::PartialIngest {
                stored: stored_chunks.len(),
                failed_chunk,
                total: chunks.len(),
                stored_chunks,
                cause: Box::new(cause),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::DocumentExtractor;
    use crate::store::MemoryPassageStore;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Length-based embedder that fails on the call numbered `fail_at`
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_at: Option<usize>,
    }

    impl CountingEmbedder {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_at,
            }
        }
    }

    #[async_trait]
    impl EmbeddingClient for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_at {
                return Err(RagError::Embedding("model unavailable".to_string()));
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    const POLICY: &str = "● Check-in starts at 3 PM every day. \
                          ● Checkout is at 11 AM sharp. \
                          ● Pets are welcome in ground floor rooms. \
                          ● Parking costs 20 dollars per night.";

    fn pipeline(
        embedder: CountingEmbedder,
        store: Arc<MemoryPassageStore>,
    ) -> IngestionPipeline {
        IngestionPipeline::new(
            Arc::new(DocumentExtractor::new()),
            Chunker::new(),
            Arc::new(embedder),
            store,
        )
    }

    #[tokio::test]
    async fn test_ingest_stores_every_chunk_in_order() {
        let store = Arc::new(MemoryPassageStore::new(2));
        let pipeline = pipeline(CountingEmbedder::new(None), store.clone());

        let report = pipeline
            .ingest(&DocumentSource::bytes("policy.txt", POLICY))
            .await
            .unwrap();

        assert_eq!(report.chunks_total, 4);
        assert_eq!(report.passages_stored, 4);
        assert_eq!(report.passage_ids.len(), 4);
        assert!(report.finished_at >= report.started_at);
        assert_eq!(
            store.contents().await,
            vec![
                "Check-in starts at 3 PM every day.",
                "Checkout is at 11 AM sharp.",
                "Pets are welcome in ground floor rooms.",
                "Parking costs 20 dollars per night.",
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_passages() {
        let store = Arc::new(MemoryPassageStore::new(2));
        let pipeline = pipeline(CountingEmbedder::new(Some(2)), store.clone());

        let err = pipeline
            .ingest(&DocumentSource::bytes("policy.txt", POLICY))
            .await
            .unwrap_err();

        match &err {
            RagError::PartialIngest {
                stored,
                failed_chunk,
                total,
                stored_chunks,
                ..
            } => {
                assert_eq!(*stored, 2);
                assert_eq!(*failed_chunk, 2);
                assert_eq!(*total, 4);
                assert_eq!(stored_chunks, &vec![0, 1]);
            }
            other => panic!("expected partial ingest, got {:?}", other),
        }
        assert_eq!(err.kind(), crate::errors::ErrorKind::Embedding);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_extraction_failure_stores_nothing() {
        let store = Arc::new(MemoryPassageStore::new(2));
        let pipeline = pipeline(CountingEmbedder::new(None), store.clone());

        let err = pipeline
            .ingest(&DocumentSource::bytes("policy.docx", "binary"))
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Extraction(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_ingest_stores_everything() {
        let store = Arc::new(MemoryPassageStore::new(2));
        let pipeline = pipeline(CountingEmbedder::new(None), store.clone()).with_concurrency(3);

        let report = pipeline
            .ingest(&DocumentSource::bytes("policy.txt", POLICY))
            .await
            .unwrap();

        assert_eq!(report.passages_stored, 4);
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_failure_accounting_matches_store() {
        let store = Arc::new(MemoryPassageStore::new(2));
        let pipeline = pipeline(CountingEmbedder::new(Some(1)), store.clone()).with_concurrency(2);

        let err = pipeline
            .ingest(&DocumentSource::bytes("policy.txt", POLICY))
            .await
            .unwrap_err();

        let stored = err.passages_stored();
        assert!(stored < 4);
        assert_eq!(store.count().await.unwrap() as usize, stored);
    }

    #[test]
    fn test_concurrency_floor() {
        let store = Arc::new(MemoryPassageStore::new(2));
        let pipeline = pipeline(CountingEmbedder::new(None), store).with_concurrency(0);
        assert_eq!(pipeline.concurrency(), 1);
    }
}
