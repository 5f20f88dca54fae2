//! Error types for price fetching and outcome classification.

use thiserror::Error;

/// Failure modes of a single price fetch.
///
/// These are carried inside `FetchResult::Failure` as values. The
/// scraper client never propagates a raw error past its boundary, so
/// the batch scheduler can aggregate outcomes uniformly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

/// User-facing classification of a provider that ended with no price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Timeout,
    ConnectionOrSsl,
    NoDataFound,
}

impl FailureCategory {
    /// Short message suitable for a provider card, never a stack trace.
    pub fn message(&self) -> &'static str {
        match self {
            FailureCategory::Timeout => "Timeout - try again",
            FailureCategory::ConnectionOrSsl => "Connection error",
            FailureCategory::NoDataFound => "No deals found",
        }
    }
}
