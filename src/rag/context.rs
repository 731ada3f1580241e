// Query context and grounded-instruction assembly
use serde::{Deserialize, Serialize};

use crate::store::{PassageId, ScoredPassage};

/// Separator placed between context passages in the instruction
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// One retrieved passage, as handed to the synthesizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: PassageId,
    pub content: String,
    pub distance: f32,
}

impl From<ScoredPassage> for RetrievedPassage {
    fn from(hit: ScoredPassage) -> Self {
        Self {
            id: hit.id,
            content: hit.content,
            distance: hit.distance,
        }
    }
}

/// Request-scoped passages for one question, nearest first. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    pub passages: Vec<RetrievedPassage>,
}

impl QueryContext {
    pub fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self { passages }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Passage contents in retrieval order
    pub fn contents(&self) -> Vec<&str> {
        self.passages.iter().map(|p| p.content.as_str()).collect()
    }

    /// Contents joined with a blank line, exactly as embedded in the instruction
    pub fn text(&self) -> String {
        self.contents().join(PASSAGE_SEPARATOR)
    }
}

/// Builds the system instruction that confines the model to the context
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    property_name: String,
}

impl ContextBuilder {
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
        }
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// The grounding rule is advisory: nothing checks that the model obeyed it.
    pub fn build_instruction(&self, context: &QueryContext) -> String {
        format!(
            "You are a helpful Concierge at {}.\n\
             Answer the guest's question using ONLY the context below.\n\
             If the answer is not in the context, politely say you don't know and offer to call the front desk.\n\
             \n\
             CONTEXT:\n\
             {}\n",
            self.property_name,
            context.text()
        )
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new("Oasis Hotel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, content: &str, distance: f32) -> RetrievedPassage {
        RetrievedPassage {
            id: PassageId(id.to_string()),
            content: content.to_string(),
            distance,
        }
    }

    #[test]
    fn test_empty_context() {
        let context = QueryContext::empty();
        assert!(context.is_empty());
        assert_eq!(context.text(), "");
    }

    #[test]
    fn test_context_text_joins_with_blank_line() {
        let context = QueryContext::new(vec![
            passage("1", "Pool opens at 7 AM.", 0.1),
            passage("2", "Towels are at the pool desk.", 0.2),
        ]);
        assert_eq!(context.text(), "Pool opens at 7 AM.\n\nTowels are at the pool desk.");
    }

    #[test]
    fn test_instruction_embeds_context_verbatim() {
        let builder = ContextBuilder::new("Harbor Inn");
        let context = QueryContext::new(vec![
            passage("1", "Checkout is at 11 AM.", 0.05),
            passage("2", "Late checkout costs $20.", 0.3),
        ]);

        let instruction = builder.build_instruction(&context);
        assert!(instruction.starts_with("You are a helpful Concierge at Harbor Inn."));
        assert!(instruction.contains("using ONLY the context below"));
        assert!(instruction.contains("front desk"));
        assert!(instruction.contains("CONTEXT:\nCheckout is at 11 AM.\n\nLate checkout costs $20.\n"));
    }

    #[test]
    fn test_instruction_with_empty_context_keeps_structure() {
        let instruction = ContextBuilder::default().build_instruction(&QueryContext::empty());
        assert!(instruction.contains("Oasis Hotel"));
        assert!(instruction.ends_with("CONTEXT:\n\n"));
    }
}
