//! Schwab brokerage adapter for the 0DTE engine.
//!
//! Implements the engine's `MarketData` and `OrderGateway` seams against the
//! Schwab REST API, plus a paper gateway and a CSV-driven replay market.

pub mod client;
pub mod error;
pub mod execution;
pub mod market_data;
pub mod options_chain;
pub mod paper;
pub mod replay;
pub mod types;

pub use client::{SchwabClient, SchwabClientConfig, SCHWAB_API_URL};
pub use error::SchwabError;
pub use execution::SchwabOrderGateway;
pub use market_data::SchwabMarketData;
pub use options_chain::parse_chain;
pub use paper::{PaperFill, PaperGateway};
pub use replay::ReplayMarket;
