//! Core types, collaborator traits, errors and configuration for the
//! QQQ 0DTE short-options engine.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod options;
pub mod position;
pub mod traits;

pub use config::{
    AppConfig, CrossRule, DatabaseConfig, ExitConfig, SchwabConfig, TradingConfig, WindowConfig,
};
pub use config_loader::ConfigLoader;
pub use error::EngineError;
pub use events::{CrossDirection, CrossEvent, IndicatorSample, PriceSample};
pub use options::{ChainEntry, OptionChain, OptionContract, OptionQuote, OptionRight};
pub use position::{CloseReason, Position, PositionStatus, Trade, TradeAction};
pub use traits::{MarketData, OrderGateway, OrderRequest, Store};
