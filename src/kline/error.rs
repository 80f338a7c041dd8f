//! Fetch error taxonomy

use thiserror::Error;

/// Why a fetch cycle produced no snapshot
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or non-2xx status from upstream
    #[error("Request error: {0}")]
    Network(String),
    /// Upstream body was not a well-formed kline array
    #[error("Parse error: {0}")]
    Parse(String),
    /// Anything else that went wrong during the cycle
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl FetchError {
    /// Log/metric category for this failure
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Parse(_) => "parse",
            FetchError::Other(_) => "other",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}
