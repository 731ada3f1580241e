//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use concierge::extraction::DocumentExtractor;
use concierge::providers::{EmbeddingClient, GenerationClient};
use concierge::rag::{RagConfig, RagPipeline};
use concierge::store::{MemoryPassageStore, PassageId, PassageStore, ScoredPassage};
use concierge::{RagError, Result};

pub const DIM: usize = 512;

/// Deterministic bag-of-words embedder: each lowercase word is hashed into a bucket
#[derive(Default)]
pub struct HashingEmbedder {
    calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vectorize(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % DIM as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vectorize(text))
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// Embeds like [`HashingEmbedder`] but fails on the call numbered `fail_at` (0-based)
pub struct FailingEmbedder {
    calls: AtomicUsize,
    fail_at: usize,
}

impl FailingEmbedder {
    pub fn failing_at(fail_at: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_at,
        }
    }
}

#[async_trait]
impl EmbeddingClient for FailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_at {
            return Err(RagError::Embedding("embedding service returned 503".to_string()));
        }
        Ok(HashingEmbedder::vectorize(text))
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Records every (instruction, question) pair and answers with a fixed reply
pub struct RecordingGenerator {
    calls: Mutex<Vec<(String, String)>>,
    reply: String,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for RecordingGenerator {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_text.to_string()));
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "recording"
    }
}

/// Completion provider that is always down
pub struct DownGenerator;

#[async_trait]
impl GenerationClient for DownGenerator {
    async fn complete(&self, _system_prompt: &str, _user_text: &str) -> Result<String> {
        Err(RagError::Generation("connection refused".to_string()))
    }

    fn model(&self) -> &str {
        "down"
    }
}

/// Memory store whose insert number `fail_at` (0-based) fails
pub struct FailingStore {
    inner: MemoryPassageStore,
    inserts: AtomicUsize,
    fail_at: usize,
}

impl FailingStore {
    pub fn failing_at(fail_at: usize) -> Self {
        Self {
            inner: MemoryPassageStore::new(DIM),
            inserts: AtomicUsize::new(0),
            fail_at,
        }
    }

    pub async fn contents(&self) -> Vec<String> {
        self.inner.contents().await
    }
}

#[async_trait]
impl PassageStore for FailingStore {
    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<PassageId> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst);
        if n == self.fail_at {
            return Err(RagError::Persistence("connection reset".to_string()));
        }
        self.inner.insert(content, embedding).await
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        self.inner.search(query, k).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

pub fn pipeline(
    embedder: Arc<dyn EmbeddingClient>,
    generator: Arc<dyn GenerationClient>,
    store: Arc<dyn PassageStore>,
) -> RagPipeline {
    pipeline_with_config(embedder, generator, store, RagConfig::default())
}

pub fn pipeline_with_config(
    embedder: Arc<dyn EmbeddingClient>,
    generator: Arc<dyn GenerationClient>,
    store: Arc<dyn PassageStore>,
    config: RagConfig,
) -> RagPipeline {
    RagPipeline::new(
        Arc::new(DocumentExtractor::new()),
        embedder,
        generator,
        store,
        config,
    )
}

/// Checked-in two-page PDF, one sentence per page
pub fn policy_pdf() -> Vec<u8> {
    include_bytes!("../fixtures/policy.pdf").to_vec()
}

/// Pipeline over a fresh memory store, with handles to the fakes
pub fn memory_pipeline(
    reply: &str,
) -> (RagPipeline, Arc<MemoryPassageStore>, Arc<RecordingGenerator>) {
    let store = Arc::new(MemoryPassageStore::new(DIM));
    let generator = Arc::new(RecordingGenerator::replying(reply));
    let pipeline = pipeline(
        Arc::new(HashingEmbedder::new()),
        generator.clone(),
        store.clone(),
    );
    (pipeline, store, generator)
}
