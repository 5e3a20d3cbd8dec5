//! Collaborator seams: market data, order routing and storage.
//!
//! The engine only ever sees these traits; concrete brokerage and database
//! clients are injected at construction.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::events::{CrossEvent, PriceSample};
use crate::options::{OptionChain, OptionQuote};
use crate::position::{Position, Trade, TradeAction};

#[async_trait]
pub trait MarketData: Send + Sync {
    async fn latest_bar(&self, ticker: &str) -> Result<PriceSample, EngineError>;

    /// Up to `lookback` most recent minute bars, oldest first.
    async fn recent_bars(&self, ticker: &str, lookback: usize)
        -> Result<Vec<PriceSample>, EngineError>;

    async fn option_chain(&self, ticker: &str, expiry: NaiveDate)
        -> Result<OptionChain, EngineError>;

    /// Fails with `QuoteUnavailable` when the contract is unknown or the market is closed.
    async fn option_quote(&self, option_symbol: &str) -> Result<OptionQuote, EngineError>;
}

/// A limit order for one option leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub account_id: String,
    pub option_symbol: String,
    pub instruction: TradeAction,
    pub contracts: i32,
    pub limit_price: Decimal,
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submits the order and returns the broker order id.
    async fn submit(&self, order: &OrderRequest) -> Result<String, EngineError>;
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_open_positions(&self, ticker: &str) -> Result<Vec<Position>, EngineError>;

    async fn create_position(&self, position: &Position) -> Result<i64, EngineError>;

    /// Returns false when no row matched the position id.
    async fn update_position(&self, position: &Position) -> Result<bool, EngineError>;

    async fn create_trade(&self, trade: &Trade) -> Result<i64, EngineError>;

    async fn create_signal(&self, event: &CrossEvent) -> Result<i64, EngineError>;
}
