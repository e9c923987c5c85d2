//! Overlapping-window text chunker with a sentence-boundary preference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
    /// Hard cap on chunks produced per document.
    pub max_chunks_per_file: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            max_chunks_per_file: 200,
        }
    }
}

impl ChunkerConfig {
    /// Overlay values from the `index` config section.
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        let index = config.get("index");
        let read = |key: &str, fallback: usize| {
            index
                .and_then(|v| v.get(key))
                .and_then(Value::as_u64)
                .map(|v| v as usize)
                .unwrap_or(fallback)
        };

        Self {
            chunk_size: read("chunk_size", defaults.chunk_size).max(1),
            chunk_overlap: read("chunk_overlap", defaults.chunk_overlap),
            max_chunks_per_file: read("max_chunks_per_file", defaults.max_chunks_per_file).max(1),
        }
    }
}

/// A text chunk positioned within its source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Character offset in the original document.
    pub start_offset: usize,
    /// Chunk index within the document.
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split `text` into overlapping chunks, trying to end each one at a
    /// sentence boundary. Empty and whitespace-only chunks are dropped.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let chunk_size = self.config.chunk_size;
        let step = chunk_size.saturating_sub(self.config.chunk_overlap).max(1);
        let max_chunks = self.config.max_chunks_per_file;

        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut chunk_index = 0;

        while start < total_chars && chunks.len() < max_chunks {
            let end = (start + chunk_size).min(total_chars);
            let window: String = chars[start..end].iter().collect();

            let chunk_text = if end < total_chars {
                trim_to_sentence_boundary(&window)
            } else {
                window
            };

            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    start_offset: start,
                    chunk_index,
                });
                chunk_index += 1;
            }

            start += step;
        }

        chunks
    }
}

/// Cut `text` back to the last sentence ending in its final fifth, if any.
fn trim_to_sentence_boundary(text: &str) -> String {
    const SENTENCE_ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let search_start = floor_char_boundary(text, (text.len() * 80) / 100);
    let search_text = &text[search_start..];

    for ending in SENTENCE_ENDINGS {
        if let Some(pos) = search_text.rfind(ending) {
            let cut = search_start + pos + ending.len();
            return text[..cut].to_string();
        }
    }

    text.to_string()
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_with_overlap_and_cap() {
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: 100,
            chunk_overlap: 20,
            max_chunks_per_file: 4,
        });

        let text = "This is a test sentence. ".repeat(40);
        let chunks = chunker.split(&text);

        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 4);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[1].start_offset, 80);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 100);
        }
    }

    #[test]
    fn prefers_sentence_boundaries() {
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: 50,
            chunk_overlap: 0,
            max_chunks_per_file: 10,
        });

        // Sentence ending lands in the final fifth of the first window.
        let text = format!("{}. {}", "a".repeat(40), "b".repeat(100));
        let chunks = chunker.split(&text);

        assert_eq!(chunks[0].text, format!("{}.", "a".repeat(40)));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = Chunker::new(ChunkerConfig::default());

        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n  ").is_empty());
    }

    #[test]
    fn boundary_search_is_utf8_safe() {
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: 20,
            chunk_overlap: 5,
            max_chunks_per_file: 50,
        });

        // Multi-byte characters around the 80% search start must not panic.
        let text = "日本語のテキストです。これはチャンク分割の確認用。".repeat(5);
        let chunks = chunker.split(&text);

        assert!(!chunks.is_empty());
    }
}
