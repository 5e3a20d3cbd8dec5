//! Row model for `zdte_trades`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zdte_core::{EngineError, Trade, TradeAction};

/// One order leg as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradeRecord {
    pub id: i64,
    pub position_id: i64,
    pub option_symbol: String,
    pub action: String,
    pub contracts: i32,
    pub price: Decimal,
    pub credit_debit: Decimal,
    pub order_id: String,
    pub trade_timestamp: DateTime<Utc>,
    pub signal_timestamp: DateTime<Utc>,
}

impl From<&Trade> for TradeRecord {
    fn from(trade: &Trade) -> Self {
        Self {
            id: 0,
            position_id: trade.position_id,
            option_symbol: trade.option_symbol.clone(),
            action: trade.action.as_str().to_string(),
            contracts: trade.contracts,
            price: trade.price,
            credit_debit: trade.credit_debit,
            order_id: trade.order_id.clone(),
            trade_timestamp: trade.trade_timestamp,
            signal_timestamp: trade.signal_timestamp,
        }
    }
}

impl TryFrom<TradeRecord> for Trade {
    type Error = EngineError;

    fn try_from(row: TradeRecord) -> Result<Self, Self::Error> {
        let action = TradeAction::parse(&row.action).ok_or_else(|| {
            EngineError::invalid_input(format!("trade {}: bad action '{}'", row.id, row.action))
        })?;
        Ok(Self {
            position_id: row.position_id,
            option_symbol: row.option_symbol,
            action,
            contracts: row.contracts,
            price: row.price,
            credit_debit: row.credit_debit,
            order_id: row.order_id,
            trade_timestamp: row.trade_timestamp,
            signal_timestamp: row.signal_timestamp,
        })
    }
}
