//! Prompt templates for summarization

use condense_common::{CondenseError, Result};
use std::path::Path;

/// Placeholder replaced by the text to summarize
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// System instruction sent with every call
pub const SYSTEM_PROMPT: &str =
    "You are a careful summarizer. Use only facts stated in the provided text. Do not speculate.";

/// Prompt for chunk summarization (map phase)
pub const MAP_PROMPT: &str = r#"Write a concise summary of the following:

"{text}"

CONCISE SUMMARY:"#;

/// Prompt for combining summaries (reduce phase)
pub const COMBINE_PROMPT: &str = r#"The following is a set of summaries:

{text}

Take these and distill them into a final, consolidated summary of the main themes. Remove duplicates and reconcile conflicting statements.

CONSOLIDATED SUMMARY:"#;

/// A prompt with a single `{text}` slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Create template, rejecting one without the `{text}` slot
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(TEXT_PLACEHOLDER) {
            return Err(CondenseError::config(format!(
                "Prompt template must contain the {} placeholder",
                TEXT_PLACEHOLDER
            )));
        }
        Ok(Self { template })
    }

    /// Read a template from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path).map_err(|e| {
            CondenseError::config(format!("Failed to read prompt {}: {}", path.display(), e))
        })?;
        Self::new(template)
    }

    /// Default map (chunk) prompt
    pub fn map_default() -> Self {
        Self { template: MAP_PROMPT.to_string() }
    }

    /// Default combine (group) prompt
    pub fn combine_default() -> Self {
        Self { template: COMBINE_PROMPT.to_string() }
    }

    /// Substitute the text
    pub fn render(&self, text: &str) -> String {
        self.template.replace(TEXT_PLACEHOLDER, text)
    }
}
