// Answer synthesis: one grounded completion per question
use std::sync::Arc;

use crate::errors::{RagError, Result};
use crate::providers::GenerationClient;
use crate::rag::context::{ContextBuilder, QueryContext};

/// Turns a question plus retrieved context into a concierge answer
pub struct AnswerSynthesizer {
    generator: Arc<dyn GenerationClient>,
    context_builder: ContextBuilder,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn GenerationClient>, property_name: impl Into<String>) -> Self {
        Self {
            generator,
            context_builder: ContextBuilder::new(property_name),
        }
    }

    pub fn context_builder(&self) -> &ContextBuilder {
        &self.context_builder
    }

    /// Exactly one generation call, even when the context is empty. No retries.
    pub async fn synthesize(&self, question: &str, context: &QueryContext) -> Result<String> {
        let instruction = self.context_builder.build_instruction(context);

        tracing::debug!(
            model = self.generator.model(),
            passages = context.len(),
            "requesting completion"
        );

        self.generator
            .complete(&instruction, question)
            .await
            .map_err(|e| match e {
                RagError::Generation(_) => e,
                other => RagError::Generation(other.to_string()),
            })
    }
}
