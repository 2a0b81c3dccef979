use serde::{Deserialize, Serialize};

/// Which stage a summarization call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLevel {
    /// Summary of one chunk (map stage)
    Chunk,
    /// Combination of several summaries (reduce stage)
    Group,
}

/// Backend-neutral generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model name (e.g., "llama3.2", "gpt-4o-mini")
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// Optional system instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Disable streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Generation options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct GenerateOptions {
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Ollama generate response
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Model name
    pub model: String,

    /// Generated text
    pub response: String,

    /// Whether generation is complete
    pub done: bool,
}

/// Chat message for OpenAI-compatible backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// OpenAI chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
}

impl From<GenerateRequest> for ChatRequest {
    fn from(request: GenerateRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(request.prompt));

        let options = request.options.unwrap_or_default();
        Self {
            model: request.model,
            messages,
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.num_predict,
        }
    }
}

/// OpenAI chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatReply,
}

/// Assistant reply; content is null for refusals and tool calls
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_skips_empty_fields() {
        let request = GenerateRequest {
            model: "llama3.2".to_string(),
            prompt: "hi".to_string(),
            system: None,
            stream: Some(false),
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert!(json.get("system").is_none());
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_chat_request_from_generate() {
        let request = GenerateRequest {
            model: "gpt-4o-mini".to_string(),
            prompt: "Summarize this".to_string(),
            system: Some("You are terse".to_string()),
            stream: None,
            options: Some(GenerateOptions {
                temperature: Some(0.2),
                top_p: None,
                num_predict: Some(256),
            }),
        };

        let chat = ChatRequest::from(request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0], ChatMessage::system("You are terse"));
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(chat.max_tokens, Some(256));
    }

    #[test]
    fn test_chat_response_null_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_content(), None);

        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Short."}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_content(), Some("Short."));
    }

    #[test]
    fn test_summary_level_serde() {
        assert_eq!(serde_json::to_string(&SummaryLevel::Group).unwrap(), "\"group\"");
    }
}
