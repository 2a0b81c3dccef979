use crate::error::CondenseError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "condense.toml";

/// Environment variable prefix (`CONDENSE_CHUNK_SIZE`, ...)
pub const ENV_PREFIX: &str = "CONDENSE";

/// LLM backend flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Ollama `/api/generate`
    Ollama,
    /// OpenAI-compatible `/v1/chat/completions`
    OpenAi,
}

/// Preferred place to cut a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitBoundary {
    Paragraph,
    Sentence,
    Word,
    Character,
}

/// How summary sizes are estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// Characters divided by four
    Chars,
    /// cl100k_base BPE token count
    Tiktoken,
}

/// Condense application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM backend
    pub llm_backend: LlmBackend,

    /// LLM API base URL
    pub llm_base_url: String,

    /// LLM summarization model name
    pub llm_model: String,

    /// API key for OpenAI-compatible backends
    pub llm_api_key: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens generated per call
    pub max_output_tokens: u32,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Preferred chunk boundary
    pub split_boundary: SplitBoundary,

    /// Size estimator used for grouping
    pub estimator: EstimatorKind,

    /// Token budget of one combine call
    pub token_budget: usize,

    /// Maximum number of reduction rounds
    pub max_rounds: usize,

    /// Maximum concurrent service calls
    pub concurrency: usize,

    /// Attempts per service call
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    pub backoff_base_ms: u64,

    /// Backoff ceiling in milliseconds
    pub backoff_max_ms: u64,

    /// Per-call timeout in seconds
    pub call_timeout_secs: u64,

    /// Optional file replacing the map (chunk) prompt
    pub map_prompt_path: Option<PathBuf>,

    /// Optional file replacing the combine (group) prompt
    pub combine_prompt_path: Option<PathBuf>,

    /// Log level
    pub log_level: String,

    /// Log directory (console only when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_backend: LlmBackend::Ollama,
            llm_base_url: "http://localhost:11434".to_string(),
            llm_model: "llama3.2:latest".to_string(),
            llm_api_key: None,
            temperature: 0.0,
            max_output_tokens: 512,
            chunk_size: 4000,
            chunk_overlap: 200,
            split_boundary: SplitBoundary::Paragraph,
            estimator: EstimatorKind::Chars,
            token_budget: 3000,
            max_rounds: 8,
            concurrency: 4,
            max_attempts: 3,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
            call_timeout_secs: 120,
            map_prompt_path: None,
            combine_prompt_path: None,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then the config file, then `CONDENSE_*` variables
    ///
    /// An explicit `path` must exist; otherwise `condense.toml` is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, CondenseError> {
        Self::load_with(path, |_| {})
    }

    /// Like [`AppConfig::load`], with `overrides` applied before validation
    pub fn load_with(path: Option<&Path>, overrides: impl FnOnce(&mut Self)) -> Result<Self, CondenseError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let file = match path {
            Some(p) => config::File::from(p.to_path_buf()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut config: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Per-call timeout
    pub fn call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CondenseError> {
        if !self.llm_base_url.starts_with("http://") && !self.llm_base_url.starts_with("https://") {
            return Err(CondenseError::config(
                "LLM base URL must start with http:// or https://",
            ));
        }

        if self.llm_model.is_empty() {
            return Err(CondenseError::config("LLM model name cannot be empty"));
        }

        if self.chunk_size == 0 {
            return Err(CondenseError::config("chunk_size must be greater than 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(CondenseError::config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.max_output_tokens == 0 || self.max_output_tokens > i32::MAX as u32 {
            return Err(CondenseError::config(format!(
                "max_output_tokens must be between 1 and {}",
                i32::MAX
            )));
        }

        if self.token_budget == 0 {
            return Err(CondenseError::config("token_budget must be greater than 0"));
        }

        if self.max_rounds == 0 {
            return Err(CondenseError::config("max_rounds must be at least 1"));
        }

        if self.concurrency == 0 {
            return Err(CondenseError::config("concurrency must be at least 1"));
        }

        if self.max_attempts == 0 {
            return Err(CondenseError::config("max_attempts must be at least 1"));
        }

        if self.call_timeout_secs == 0 {
            return Err(CondenseError::config("call_timeout_secs must be greater than 0"));
        }

        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(CondenseError::config(
                "backoff_base_ms cannot exceed backoff_max_ms",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm_backend, LlmBackend::Ollama);
        assert_eq!(config.token_budget, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut invalid = AppConfig::default();
        invalid.chunk_overlap = invalid.chunk_size;
        assert!(matches!(invalid.validate(), Err(CondenseError::Config(_))));

        let mut invalid = AppConfig::default();
        invalid.llm_base_url = "localhost:11434".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = AppConfig::default();
        invalid.max_rounds = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = AppConfig::default();
        invalid.max_output_tokens = u32::MAX;
        assert!(invalid.validate().is_err());

        let mut invalid = AppConfig::default();
        invalid.chunk_size = 0;
        invalid.chunk_overlap = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "llm_backend = \"openai\"\nllm_base_url = \"https://api.example.com\"\nchunk_size = 1200\nchunk_overlap = 0\nsplit_boundary = \"sentence\""
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.llm_backend, LlmBackend::OpenAi);
        assert_eq!(config.chunk_size, 1200);
        assert_eq!(config.chunk_overlap, 0);
        assert_eq!(config.split_boundary, SplitBoundary::Sentence);
        // untouched keys keep their defaults
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "chunk_size = 100\nchunk_overlap = 100").unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, CondenseError::Config(_)));
    }

    #[test]
    fn test_overrides_apply_before_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        // smaller than the default overlap
        writeln!(file, "chunk_size = 100").unwrap();

        assert!(AppConfig::load(Some(file.path())).is_err());

        let config = AppConfig::load_with(Some(file.path()), |c| c.chunk_overlap = 0).unwrap();
        assert_eq!((config.chunk_size, config.chunk_overlap), (100, 0));

        let err = AppConfig::load_with(Some(file.path()), |c| c.max_rounds = 0).unwrap_err();
        assert!(matches!(err, CondenseError::Config(_)));
    }
}
