use condense_common::{CondenseError, Result, SplitBoundary};

use crate::document::Chunk;

const PARAGRAPH_BREAKS: &[&str] = &["\n\n"];

// Korean and English sentence endings
const SENTENCE_ENDINGS: &[&str] = &[". ", ".\n", "! ", "!\n", "? ", "?\n", "。", "！", "？"];

const WORD_BREAKS: &[&str] = &["\n", " ", "\t"];

/// Splits text into bounded, optionally overlapping chunks
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_size: usize,
    overlap: usize,
    boundary: SplitBoundary,
}

impl Chunker {
    /// Create chunker; sizes are in characters
    pub fn new(max_size: usize, overlap: usize, boundary: SplitBoundary) -> Result<Self> {
        if max_size == 0 {
            return Err(CondenseError::config("chunk size must be greater than 0"));
        }
        if overlap >= max_size {
            return Err(CondenseError::config(format!(
                "chunk overlap ({}) must be less than chunk size ({})",
                overlap, max_size
            )));
        }
        Ok(Self { max_size, overlap, boundary })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text; chunk indices start at 0 and `document` is left at 0
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every char position, plus the end of the text
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        if total <= self.max_size {
            // Text is short enough, return as single chunk
            return vec![Chunk {
                index: 0,
                document: 0,
                text: text.to_string(),
                start: 0,
                end: total,
            }];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let limit = (start + self.max_size).min(total);
            let end = if limit < total {
                self.find_break(text, &offsets, start, limit)
            } else {
                limit
            };

            chunks.push(Chunk {
                index: chunks.len(),
                document: 0,
                text: text[offsets[start]..offsets[end]].to_string(),
                start,
                end,
            });

            if end >= total {
                break;
            }

            // end > start + overlap, so this always moves forward
            start = end - self.overlap;
        }

        chunks
    }

    /// Last acceptable boundary in the back half of the window, else a hard cut at `limit`
    fn find_break(&self, text: &str, offsets: &[usize], start: usize, limit: usize) -> usize {
        let floor = start + (self.overlap + 1).max(self.max_size / 2);
        let window = &text[offsets[floor]..offsets[limit]];

        for separators in fallback_chain(self.boundary) {
            let best = separators
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|idx| idx + sep.len()))
                .max();

            if let Some(cut) = best {
                return floor + window[..cut].chars().count();
            }
        }

        limit
    }
}

/// Separators to try, most preferred first
fn fallback_chain(boundary: SplitBoundary) -> &'static [&'static [&'static str]] {
    match boundary {
        SplitBoundary::Paragraph => &[PARAGRAPH_BREAKS, SENTENCE_ENDINGS, WORD_BREAKS],
        SplitBoundary::Sentence => &[SENTENCE_ENDINGS, WORD_BREAKS],
        SplitBoundary::Word => &[WORD_BREAKS],
        SplitBoundary::Character => &[],
    }
}

/// Split text preferring paragraph boundaries
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(max_size, overlap, SplitBoundary::Paragraph)?.split(text))
}
