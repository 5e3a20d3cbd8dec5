use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One minute bar of the underlying: close price and traded volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub volume: u64,
}

impl PriceSample {
    #[must_use]
    pub fn new(ticker: &str, timestamp: DateTime<Utc>, price: Decimal, volume: u64) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            timestamp,
            price,
            volume,
        }
    }
}

/// Indicator values aligned 1:1 with a [`PriceSample`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSample {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub sma9: Decimal,
    pub vwap: Decimal,
}

impl IndicatorSample {
    /// `sma9 - vwap`; the sign of this drives cross detection.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.sma9 - self.vwap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossDirection {
    /// SMA9 crossed above VWAP.
    Up,
    /// SMA9 crossed below VWAP.
    Down,
}

impl CrossDirection {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

impl std::fmt::Display for CrossDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flip in sign of `sma9 - vwap` between consecutive samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossEvent {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub sma9: Decimal,
    pub vwap: Decimal,
    pub direction: CrossDirection,
}

impl CrossEvent {
    #[must_use]
    pub fn from_sample(sample: &IndicatorSample, direction: CrossDirection) -> Self {
        Self {
            ticker: sample.ticker.clone(),
            timestamp: sample.timestamp,
            price: sample.price,
            sma9: sample.sma9,
            vwap: sample.vwap,
            direction,
        }
    }
}
