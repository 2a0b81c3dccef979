use condense_common::{EstimatorKind, Result};
use std::sync::Arc;

/// Approximate size of a text in the service's native unit (tokens)
///
/// Must grow monotonically with text length for budget packing to hold.
pub trait SizeEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

impl<F> SizeEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}

/// Characters divided by a fixed ratio, rounded up
#[derive(Debug, Clone, Copy)]
pub struct CharEstimator {
    chars_per_token: usize,
}

impl CharEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self { chars_per_token: chars_per_token.max(1) }
    }
}

impl Default for CharEstimator {
    // ~4 chars per token for English text
    fn default() -> Self {
        Self::new(4)
    }
}

impl SizeEstimator for CharEstimator {
    fn estimate(&self, text: &str) -> usize {
        (text.chars().count() + self.chars_per_token - 1) / self.chars_per_token
    }
}

/// cl100k_base BPE token count (GPT-4 / GPT-3.5 tokenizer)
pub struct TiktokenEstimator {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenEstimator {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()?;
        Ok(Self { bpe })
    }
}

impl SizeEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Build the estimator selected in the configuration
pub fn estimator_for(kind: EstimatorKind) -> Result<Arc<dyn SizeEstimator>> {
    let estimator: Arc<dyn SizeEstimator> = match kind {
        EstimatorKind::Chars => Arc::new(CharEstimator::default()),
        EstimatorKind::Tiktoken => Arc::new(TiktokenEstimator::new()?),
    };
    Ok(estimator)
}
