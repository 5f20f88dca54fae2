use std::error::Error;
use std::fmt;

/// Unified application error.
///
/// This ensures all layers (config, IO, network, parsing, storage)
/// fail in a predictable and debuggable way. Fetch-level failures are
/// deliberately not represented here; those travel as typed
/// `FetchResult` values so the scheduler can aggregate them.
#[derive(Debug)]
pub enum AppError {
    Config(String),
    Network(String),
    Parse(String),
    Database(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Parse(msg) => write!(f, "Parse error: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl Error for AppError {}
