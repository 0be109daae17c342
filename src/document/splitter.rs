use std::iter;

use log::info;
use serde::{Deserialize, Serialize};

use super::loader::PageRecord;
use crate::error::{RagError, Result};

/// Preferred cut points, strongest first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub source: String,
}

/// Character-window splitter. Consecutive chunks share exactly `chunk_overlap`
/// characters, so the original text is recoverable from the chunk sequence.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::config("chunk size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn split_pages(&self, pages: &[PageRecord]) -> Vec<TextChunk> {
        let chunks: Vec<TextChunk> = pages
            .iter()
            .filter(|page| !page.content.trim().is_empty())
            .flat_map(|page| {
                self.split_text(&page.content)
                    .into_iter()
                    .map(move |content| TextChunk {
                        content,
                        source: page.source.clone(),
                    })
            })
            .collect();
        info!("✂️ Split into {} chunks", chunks.len());
        chunks
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        // offsets[k] is the byte offset of the k-th char; the last entry is text.len().
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut chunks = Vec::new();
        if total == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            if total - start <= self.chunk_size {
                chunks.push(text[offsets[start]..].to_string());
                break;
            }
            let end = self.cut_point(text, &offsets, start);
            chunks.push(text[offsets[start]..offsets[end]].to_string());
            start = end - self.chunk_overlap;
        }
        chunks
    }

    /// Picks the exclusive end (in chars) of the window starting at `start`.
    /// The end always lies beyond `start + chunk_overlap` so the next window
    /// moves forward.
    fn cut_point(&self, text: &str, offsets: &[usize], start: usize) -> usize {
        let hard_end = start + self.chunk_size;
        let floor = (start + self.chunk_size / 2).max(start + self.chunk_overlap + 1);
        let window = &text[offsets[floor]..offsets[hard_end]];

        for separator in SEPARATORS {
            if let Some(pos) = window.rfind(separator) {
                let byte_end = offsets[floor] + pos + separator.len();
                if let Ok(char_end) = offsets.binary_search(&byte_end) {
                    return char_end;
                }
            }
        }
        hard_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut text = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                text.push_str(chunk);
            } else {
                text.extend(chunk.chars().skip(overlap));
            }
        }
        text
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for i in 0..120 {
            text.push_str(&format!(
                "Sentence {} describes acne vulgaris and its treatment options. ",
                i
            ));
            if i % 7 == 0 {
                text.push_str("\n\n");
            } else if i % 3 == 0 {
                text.push('\n');
            }
        }
        text
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert!(matches!(TextSplitter::new(100, 100), Err(RagError::Config(_))));
        assert!(matches!(TextSplitter::new(0, 0), Err(RagError::Config(_))));
        assert!(TextSplitter::new(1000, 100).is_ok());
    }

    #[test]
    fn test_reconstruction_across_sizes() {
        let text = sample_text();
        for (size, overlap) in [(1000, 100), (200, 50), (64, 0), (37, 36), (10, 3)] {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split_text(&text);
            assert!(chunks.len() > 1, "size {} produced a single chunk", size);
            assert_eq!(reconstruct(&chunks, overlap), text, "size {} overlap {}", size, overlap);
        }
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = sample_text();
        let splitter = TextSplitter::new(300, 40).unwrap();
        let chunks = splitter.split_text(&text);
        for pair in chunks.windows(2) {
            assert!(pair[0].chars().count() <= 300);
            let tail: String = pair[0]
                .chars()
                .skip(pair[0].chars().count() - 40)
                .collect();
            let head: String = pair[1].chars().take(40).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_prefers_natural_boundaries() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let splitter = TextSplitter::new(20, 0).unwrap();
        let chunks = splitter.split_text(text);
        assert_eq!(chunks[0], "alpha beta gamma ");
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "Ödem führt zu Schwellung – β-Blocker, 日本語のテキスト、".repeat(20);
        let splitter = TextSplitter::new(25, 5).unwrap();
        let chunks = splitter.split_text(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 25));
        assert_eq!(reconstruct(&chunks, 5), text);
    }

    #[test]
    fn test_short_and_empty_text() {
        let splitter = TextSplitter::new(1000, 100).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert_eq!(splitter.split_text("short"), vec!["short".to_string()]);
    }

    #[test]
    fn test_split_pages_keeps_source_and_skips_blank_pages() {
        let pages = vec![
            PageRecord {
                content: "x".repeat(250),
                source: "data/book.pdf".into(),
                page: 1,
            },
            PageRecord {
                content: "   \n ".into(),
                source: "data/book.pdf".into(),
                page: 2,
            },
            PageRecord {
                content: "y".repeat(50),
                source: "data/book.pdf".into(),
                page: 3,
            },
        ];
        let splitter = TextSplitter::new(100, 10).unwrap();
        let chunks = splitter.split_pages(&pages);
        // 250 chars: windows [0,100) [90,190) [180,250)
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.source == "data/book.pdf"));
        assert_eq!(chunks[3].content, "y".repeat(50));
    }
}
