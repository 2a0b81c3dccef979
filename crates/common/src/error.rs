/// Failure reported by the external summarization service
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The call did not finish within its deadline
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The service asked us to slow down (HTTP 429)
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection or transport failure
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with no text
    #[error("empty response from service")]
    EmptyResponse,

    /// The response body could not be understood
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl ServiceError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == 429 {
            Self::RateLimited(body)
        } else {
            Self::Http { status, body }
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited(_) | Self::Network(_) | Self::EmptyResponse => true,
            Self::Http { status, .. } => *status >= 500 || *status == 408,
            Self::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), e.to_string())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A chunk that could not be summarized within the retry budget
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chunk {index} failed after {attempts} attempt(s): {error}")]
pub struct MapFailure {
    /// Global chunk index
    pub index: usize,

    /// Attempts spent before giving up
    pub attempts: u32,

    /// Last error returned by the service
    #[source]
    pub error: ServiceError,
}

/// Condense error types
#[derive(Debug, thiserror::Error)]
pub enum CondenseError {
    /// Invalid chunk/overlap/budget parameters or configuration source
    #[error("Configuration error: {0}")]
    Config(String),

    /// Service failure surfaced after local retries
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// One or more chunks could not be summarized
    #[error(
        "Map phase incomplete: {} chunk(s) failed {:?}",
        .failures.len(),
        failed_indices(.failures)
    )]
    IncompleteMap { failures: Vec<MapFailure> },

    /// A reduction round could not shrink the summary count
    #[error(
        "Reduction stalled in round {round}: {count} summaries cannot be combined under the token budget"
    )]
    ReduceStalled { round: usize, count: usize },

    /// Round budget exhausted before a single summary remained
    #[error("Reduction did not converge within {rounds} round(s): {remaining} summaries remain")]
    ReduceTimeout { rounds: usize, remaining: usize },

    /// The run was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn failed_indices(failures: &[MapFailure]) -> Vec<usize> {
    failures.iter().map(|f| f.index).collect()
}

impl CondenseError {
    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Indices of the chunks that failed, if this is a map failure
    pub fn failed_chunks(&self) -> Vec<usize> {
        match self {
            Self::IncompleteMap { failures } => failed_indices(failures),
            _ => Vec::new(),
        }
    }
}

impl From<config::ConfigError> for CondenseError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

// Process exit status for the command-line front end
impl CondenseError {
    /// Get exit code
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::InvalidInput(_) => 2,
            Self::Cancelled => 130,
            Self::Service(_) => 3,
            Self::IncompleteMap { .. } => 3,
            Self::ReduceStalled { .. } => 4,
            Self::ReduceTimeout { .. } => 4,
            Self::Io(_) => 1,
            Self::Json(_) => 1,
            Self::Other(_) => 1,
        }
    }
}
