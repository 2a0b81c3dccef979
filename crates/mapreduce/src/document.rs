use condense_llm::SummaryLevel;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Separator placed between summaries when a group is combined
pub const GROUP_SEPARATOR: &str = "\n\n";

/// Source text to summarize; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    id: String,
    source: Option<String>,
    text: String,
}

impl Document {
    /// Create document without source metadata
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self { id: content_id(&text), source: None, text }
    }

    /// Create document remembering where it came from (path, URL, ...)
    pub fn with_source(text: impl Into<String>, source: impl Into<String>) -> Self {
        let mut document = Self::new(text);
        document.source = Some(source.into());
        document
    }

    /// Stable content id (first 16 hex digits of SHA-256)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when there is nothing worth summarizing
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Source if known, otherwise the content id
    pub fn label(&self) -> &str {
        self.source().unwrap_or(&self.id)
    }
}

fn content_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..8])
}

/// Contiguous slice of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Global sequence index across all documents of a run
    pub index: usize,

    /// Position of the owning document in the input
    pub document: usize,

    /// Chunk text
    pub text: String,

    /// Start offset in the document, in characters
    pub start: usize,

    /// End offset (exclusive), in characters
    pub end: usize,
}

impl Chunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Text produced by the summarization service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub text: String,

    /// Chunk-level (map) or group-level (reduce)
    pub level: SummaryLevel,

    /// Estimated size in tokens
    pub tokens: usize,

    /// Reduction round that produced it; 0 for chunk summaries
    pub round: usize,

    /// First chunk index covered
    pub first_chunk: usize,

    /// Last chunk index covered (inclusive)
    pub last_chunk: usize,
}

impl Summary {
    /// Summary of a single chunk
    pub fn for_chunk(chunk: &Chunk, text: String, tokens: usize) -> Self {
        Self {
            text,
            level: SummaryLevel::Chunk,
            tokens,
            round: 0,
            first_chunk: chunk.index,
            last_chunk: chunk.index,
        }
    }

    /// Summary combining a whole group
    pub fn combined(group: &Group, text: String, tokens: usize, round: usize) -> Self {
        Self {
            text,
            level: SummaryLevel::Group,
            tokens,
            round,
            first_chunk: group.first_chunk(),
            last_chunk: group.last_chunk(),
        }
    }

    /// Number of chunks this summary stands for
    pub fn chunk_count(&self) -> usize {
        self.last_chunk - self.first_chunk + 1
    }
}

/// Ordered batch of summaries combined by one service call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    summaries: Vec<Summary>,
    tokens: usize,
    oversized: bool,
}

impl Group {
    /// Singleton for a summary that alone exceeds the budget
    pub(crate) fn oversized(summary: Summary) -> Self {
        let mut group = Self::default();
        group.push(summary);
        group.oversized = true;
        group
    }

    pub(crate) fn push(&mut self, summary: Summary) {
        self.tokens += summary.tokens;
        self.summaries.push(summary);
    }

    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }

    /// Cumulative estimated size
    pub fn tokens(&self) -> usize {
        self.tokens
    }

    /// Set when the group is a forced singleton over the budget
    pub fn is_oversized(&self) -> bool {
        self.oversized
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn first_chunk(&self) -> usize {
        self.summaries.first().map_or(0, |s| s.first_chunk)
    }

    pub fn last_chunk(&self) -> usize {
        self.summaries.last().map_or(0, |s| s.last_chunk)
    }

    /// Texts joined by a blank line, in order
    pub fn combined_text(&self) -> String {
        self.summaries
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(GROUP_SEPARATOR)
    }

    pub fn into_summaries(self) -> Vec<Summary> {
        self.summaries
    }
}
