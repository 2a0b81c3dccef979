//! Condense LLM Integration
//!
//! Ollama and OpenAI-compatible clients, prompt templates and the
//! summarization service consumed by the map-reduce pipeline

mod client;
mod llm_trait;
mod openai_client;
mod prompts;
mod summarize;
mod types;

pub use client::OllamaClient;
pub use llm_trait::{LlmClient, SummarizationService};
pub use openai_client::OpenAiClient;
pub use prompts::{PromptTemplate, COMBINE_PROMPT, MAP_PROMPT, SYSTEM_PROMPT, TEXT_PLACEHOLDER};
pub use summarize::Summarizer;
pub use types::{
    ChatChoice, ChatMessage, ChatReply, ChatRequest, ChatResponse, GenerateOptions, GenerateRequest, GenerateResponse,
    SummaryLevel,
};
