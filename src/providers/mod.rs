//! Model providers
//!
//! The core only depends on two capabilities: turning text into a
//! fixed-dimension vector, and chat-style completion. Any backend that
//! satisfies these traits can be plugged into the pipelines.

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ProviderKind, ProvidersConfig};
use crate::errors::{RagError, Result};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// Maps text to a fixed-length vector
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector dimension produced by the model in use
    fn dimension(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Chat-style text completion
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Complete `user_text` under `system_prompt`, returning the first completion
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String>;

    /// Model used for completions
    fn model(&self) -> &str;
}

/// Check that a provider returned a usable vector of the expected size
pub(crate) fn check_embedding(embedding: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if embedding.is_empty() {
        return Err(RagError::Embedding("provider returned an empty embedding".to_string()));
    }
    if embedding.len() != expected {
        return Err(RagError::Embedding(format!(
            "expected {} dimensions, provider returned {}",
            expected,
            embedding.len()
        )));
    }
    Ok(embedding)
}

/// Build the embedding and generation clients named in the configuration
pub fn from_config(
    config: &ProvidersConfig,
) -> Result<(Arc<dyn EmbeddingClient>, Arc<dyn GenerationClient>)> {
    match config.kind {
        ProviderKind::Ollama => {
            let client = Arc::new(OllamaClient::from_config(config)?);
            let embedder: Arc<dyn EmbeddingClient> = client.clone();
            let generator: Arc<dyn GenerationClient> = client;
            Ok((embedder, generator))
        }
        ProviderKind::OpenAi => {
            let client = Arc::new(OpenAiClient::from_config(config)?);
            let embedder: Arc<dyn EmbeddingClient> = client.clone();
            let generator: Arc<dyn GenerationClient> = client;
            Ok((embedder, generator))
        }
    }
}
