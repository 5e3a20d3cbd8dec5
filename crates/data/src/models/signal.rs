//! Row model for `zdte_signals`, the crossover audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zdte_core::{CrossDirection, CrossEvent, EngineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SignalRecord {
    pub id: i64,
    pub ticker: String,
    pub signal_timestamp: DateTime<Utc>,
    pub direction: String,
    pub price: Decimal,
    pub sma9: Decimal,
    pub vwap: Decimal,
}

impl From<&CrossEvent> for SignalRecord {
    fn from(event: &CrossEvent) -> Self {
        Self {
            id: 0,
            ticker: event.ticker.clone(),
            signal_timestamp: event.timestamp,
            direction: event.direction.as_str().to_string(),
            price: event.price,
            sma9: event.sma9,
            vwap: event.vwap,
        }
    }
}

impl TryFrom<SignalRecord> for CrossEvent {
    type Error = EngineError;

    fn try_from(row: SignalRecord) -> Result<Self, Self::Error> {
        let direction = CrossDirection::parse(&row.direction).ok_or_else(|| {
            EngineError::invalid_input(format!("signal {}: bad direction '{}'", row.id, row.direction))
        })?;
        Ok(Self {
            ticker: row.ticker,
            timestamp: row.signal_timestamp,
            price: row.price,
            sma9: row.sma9,
            vwap: row.vwap,
            direction,
        })
    }
}
