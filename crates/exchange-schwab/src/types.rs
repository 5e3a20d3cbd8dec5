//! Wire shapes of the Schwab market-data and trader APIs.
//!
//! Only the fields the engine reads are declared; everything else is
//! ignored by serde.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `GET /marketdata/v1/pricehistory`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPriceHistory {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub empty: bool,
    #[serde(default)]
    pub candles: Vec<RawCandle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCandle {
    pub close: Decimal,
    pub volume: u64,
    /// Epoch milliseconds of the bar open.
    pub datetime: i64,
}

/// One entry of `GET /marketdata/v1/quotes`, keyed by symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuoteEnvelope {
    #[serde(default)]
    pub symbol: Option<String>,
    pub quote: Option<RawQuote>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuote {
    #[serde(default)]
    pub bid_price: Decimal,
    #[serde(default)]
    pub ask_price: Decimal,
    #[serde(default)]
    pub last_price: Decimal,
}

pub type RawQuotes = HashMap<String, RawQuoteEnvelope>;

/// `GET /marketdata/v1/chains`.
///
/// Expiry maps are keyed `"YYYY-MM-DD:<days>"`, then by strike string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChain {
    pub symbol: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub underlying_price: Decimal,
    #[serde(default)]
    pub call_exp_date_map: HashMap<String, HashMap<String, Vec<RawOptionContract>>>,
    #[serde(default)]
    pub put_exp_date_map: HashMap<String, HashMap<String, Vec<RawOptionContract>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptionContract {
    pub put_call: String,
    pub symbol: String,
    #[serde(default)]
    pub bid: Decimal,
    #[serde(default)]
    pub ask: Decimal,
    #[serde(default)]
    pub last: Decimal,
    pub strike_price: Decimal,
}

/// Body of `POST /trader/v1/accounts/{hash}/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    pub order_type: &'static str,
    pub session: &'static str,
    pub duration: &'static str,
    pub order_strategy_type: &'static str,
    /// Limit price as a string, as the API expects.
    pub price: String,
    pub order_leg_collection: Vec<RawOrderLeg>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderLeg {
    pub instruction: &'static str,
    pub quantity: i32,
    pub instrument: RawInstrument,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstrument {
    pub symbol: String,
    pub asset_type: &'static str,
}
