//! Error taxonomy for the signal and position-lifecycle engine.
//!
//! Every collaborator call and every engine operation returns
//! `Result<T, EngineError>`, so callers can tell "no data" apart from
//! "failed" apart from "success".

use thiserror::Error;

/// Errors raised by the engine and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No live quote for the contract (not found, market closed, empty book).
    #[error("quote unavailable for {symbol}: {reason}")]
    QuoteUnavailable {
        /// Option or equity symbol that was requested.
        symbol: String,
        /// Why the quote could not be produced.
        reason: String,
    },

    /// The brokerage refused the order. Not retried without operator review.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Storage connectivity or constraint failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Data-integrity violation (zero entry credit, closing a non-open position, ...).
    #[error("invalid position state: {0}")]
    InvalidPositionState(String),

    /// Malformed input series (unordered, mixed tickers, non-positive prices).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator call exceeded its time bound.
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// Name of the collaborator operation.
        operation: &'static str,
        /// Configured bound in seconds.
        secs: u64,
    },

    /// Entries are suspended until an operator restarts the engine.
    #[error("engine halted: {0}")]
    Halted(String),

    /// Market-data transport failure that is not a missing quote.
    #[error("market data error: {0}")]
    MarketData(String),
}

impl EngineError {
    /// Creates a quote-unavailable error.
    pub fn quote_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QuoteUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Creates a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates an invalid-position-state error.
    pub fn invalid_position(message: impl Into<String>) -> Self {
        Self::InvalidPositionState(message.into())
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns true if the failed step should simply be retried on the next tick.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::QuoteUnavailable { .. }
                | Self::Persistence(_)
                | Self::MarketData(_)
                | Self::InvalidInput(_)
        ) || matches!(self, Self::Timeout { operation, .. } if *operation != "submit_order")
    }

    /// Returns true if the error leaves order state unknown and needs an operator.
    #[must_use]
    pub fn requires_operator(&self) -> bool {
        matches!(
            self,
            Self::OrderRejected(_) | Self::Timeout { operation: "submit_order", .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_and_persistence_errors_are_transient() {
        assert!(EngineError::quote_unavailable("QQQ", "closed").is_transient());
        assert!(EngineError::persistence("connection reset").is_transient());
        assert!(EngineError::Timeout {
            operation: "option_quote",
            secs: 10
        }
        .is_transient());
    }

    #[test]
    fn order_timeouts_need_an_operator() {
        let err = EngineError::Timeout {
            operation: "submit_order",
            secs: 10,
        };
        assert!(!err.is_transient());
        assert!(err.requires_operator());
        assert!(EngineError::OrderRejected("margin".into()).requires_operator());
    }

    #[test]
    fn invalid_position_is_neither_transient_nor_operator_bound() {
        let err = EngineError::invalid_position("entry credit is zero");
        assert!(!err.is_transient());
        assert!(!err.requires_operator());
        assert_eq!(err.to_string(), "invalid position state: entry credit is zero");
    }
}
