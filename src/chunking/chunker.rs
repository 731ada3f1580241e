// Chunker: splits normalized document text into retrievable passages
use serde::{Deserialize, Serialize};

/// Separator used both to split sentences and to re-join them
const SENTENCE_SEPARATOR: &str = ". ";

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Bullet marker that delimits passages in policy documents
    pub delimiter: char,
    /// Soft upper bound for sentence-accumulated chunks, in characters
    pub max_chunk_chars: usize,
    /// Chunks shorter than this after trimming are dropped
    pub min_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            delimiter: '●',
            max_chunk_chars: 300,
            min_chunk_chars: 20,
        }
    }
}

/// Collapse every whitespace run (newlines included) to a single space
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Two-tier chunker: bullet delimiters first, sentence accumulation otherwise
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Normalize raw extracted text, then chunk it
    pub fn chunk_document(&self, raw: &str) -> Vec<String> {
        self.chunk(&normalize(raw))
    }

    /// Chunk already-normalized text.
    ///
    /// Every returned chunk is trimmed and at least `min_chunk_chars` long.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let segments: Vec<&str> = text.split(self.config.delimiter).collect();

        let candidates = if segments.len() > 1 {
            segments.into_iter().map(str::to_string).collect()
        } else {
            self.accumulate_sentences(text)
        };

        candidates
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| char_len(chunk) >= self.config.min_chunk_chars)
            .collect()
    }

    /// Greedily pack sentences into buffers of at most `max_chunk_chars`.
    /// A sentence that is longer than the bound on its own stays whole.
    fn accumulate_sentences(&self, text: &str) -> Vec<String> {
        let max = self.config.max_chunk_chars;
        let separator_len = char_len(SENTENCE_SEPARATOR);
        // The trailing space is trimmed away, only the period counts toward the bound
        let terminator_len = char_len(SENTENCE_SEPARATOR.trim_end());

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        for unit in text.split(SENTENCE_SEPARATOR) {
            let unit_len = char_len(unit);
            if buffer_len > 0 && buffer_len + unit_len + terminator_len > max {
                chunks.push(std::mem::take(&mut buffer));
                buffer_len = 0;
            }
            buffer.push_str(unit);
            buffer.push_str(SENTENCE_SEPARATOR);
            buffer_len += unit_len + separator_len;
        }

        if !buffer.trim().is_empty() {
            chunks.push(buffer);
        }

        chunks
    }
}
