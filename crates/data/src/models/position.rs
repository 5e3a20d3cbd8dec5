//! Row model for `zdte_positions`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zdte_core::{CloseReason, EngineError, OptionRight, Position, PositionStatus, TradeAction};

/// A position row. Enum columns are stored as their canonical strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PositionRecord {
    /// Zero until the row has been inserted.
    pub id: i64,
    pub ticker: String,
    pub option_symbol: String,
    pub option_type: String,
    pub strike_price: Decimal,
    pub expiration_date: NaiveDate,
    pub action: String,
    pub contracts: i32,
    pub entry_price: Decimal,
    pub entry_credit: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Option<Decimal>,
    pub status: String,
    pub close_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<&Position> for PositionRecord {
    fn from(pos: &Position) -> Self {
        Self {
            id: pos.id.unwrap_or_default(),
            ticker: pos.ticker.clone(),
            option_symbol: pos.option_symbol.clone(),
            option_type: pos.option_type.as_str().to_string(),
            strike_price: pos.strike_price,
            expiration_date: pos.expiration_date,
            action: pos.action.as_str().to_string(),
            contracts: pos.contracts,
            entry_price: pos.entry_price,
            entry_credit: pos.entry_credit,
            current_price: pos.current_price,
            unrealized_pnl: pos.unrealized_pnl,
            realized_pnl: pos.realized_pnl,
            status: pos.status.as_str().to_string(),
            close_reason: pos.close_reason.map(|r| r.as_str().to_string()),
            created_at: pos.created_at,
            closed_at: pos.closed_at,
        }
    }
}

impl TryFrom<PositionRecord> for Position {
    type Error = EngineError;

    fn try_from(row: PositionRecord) -> Result<Self, Self::Error> {
        let bad = |column: &str, value: &str| {
            EngineError::invalid_position(format!("position {}: bad {column} '{value}'", row.id))
        };
        let option_type =
            OptionRight::parse(&row.option_type).ok_or_else(|| bad("option_type", &row.option_type))?;
        let action = TradeAction::parse(&row.action).ok_or_else(|| bad("action", &row.action))?;
        let status = PositionStatus::parse(&row.status).ok_or_else(|| bad("status", &row.status))?;
        let close_reason = match &row.close_reason {
            Some(s) => Some(CloseReason::parse(s).ok_or_else(|| bad("close_reason", s))?),
            None => None,
        };

        Ok(Self {
            id: Some(row.id),
            ticker: row.ticker,
            option_symbol: row.option_symbol,
            option_type,
            strike_price: row.strike_price,
            expiration_date: row.expiration_date,
            action,
            contracts: row.contracts,
            entry_price: row.entry_price,
            entry_credit: row.entry_credit,
            current_price: row.current_price,
            unrealized_pnl: row.unrealized_pnl,
            realized_pnl: row.realized_pnl,
            status,
            close_reason,
            created_at: row.created_at,
            closed_at: row.closed_at,
        })
    }
}
