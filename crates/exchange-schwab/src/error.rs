//! Error types for the Schwab adapter.

use thiserror::Error;
use zdte_core::EngineError;

/// Errors that can occur when talking to Schwab.
#[derive(Debug, Error)]
pub enum SchwabError {
    /// Missing or rejected credentials.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Non-success HTTP status.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Request could not be sent or its response could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the client timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Symbol absent from the response.
    #[error("symbol not found: {symbol}")]
    NotFound {
        /// Requested symbol.
        symbol: String,
    },
}

impl SchwabError {
    /// Creates an API error from a status code and body.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SchwabError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SchwabError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Market-data failures: a missing symbol is a missing quote, anything else
/// is a transport problem.
impl From<SchwabError> for EngineError {
    fn from(e: SchwabError) -> Self {
        match e {
            SchwabError::NotFound { symbol } => {
                EngineError::quote_unavailable(symbol, "not in Schwab response")
            }
            SchwabError::Api {
                status_code: 404, ..
            } => EngineError::quote_unavailable("", e.to_string()),
            other => EngineError::MarketData(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchwabError>;
