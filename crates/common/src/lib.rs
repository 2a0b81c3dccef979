pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, EstimatorKind, LlmBackend, SplitBoundary};
pub use error::{CondenseError, MapFailure, ServiceError};
pub type Result<T> = std::result::Result<T, CondenseError>;
