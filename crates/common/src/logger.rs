use crate::error::CondenseError;
use std::path::Path;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "condense.log";

/// Initialize logging system
///
/// Console output goes to stderr so stdout stays reserved for the summary.
/// When `log_dir` is set, a plain-text copy is appended to `condense.log` there.
///
/// # Arguments
/// * `log_dir` - Directory where the log file will be stored
/// * `log_level` - Log level (trace, debug, info, warn, error)
pub fn setup_logging(log_dir: Option<&Path>, log_level: &str) -> Result<(), CondenseError> {
    let Some(log_dir) = log_dir else {
        return setup_console_logging(log_level);
    };

    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            CondenseError::config(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    }

    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| {
            CondenseError::config(format!(
                "Failed to open log file {}: {}",
                log_file_path.display(),
                e
            ))
        })?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(log_level));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false) // Remove ANSI color codes in files
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CondenseError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::info!("Logging initialized: level={}, log_file={}", log_level, log_file_path.display());

    Ok(())
}

/// Simple logging setup (console only)
pub fn setup_console_logging(log_level: &str) -> Result<(), CondenseError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(env_filter(log_level))
        .try_init()
        .map_err(|e| CondenseError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!("Console logging initialized: level={}", log_level);

    Ok(())
}

// RUST_LOG takes precedence over the configured level
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}
