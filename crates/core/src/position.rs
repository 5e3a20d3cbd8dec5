//! Short option positions and the order legs that open and close them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::options::{OptionContract, OptionRight, CONTRACT_MULTIPLIER};

/// Order instruction for an option leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    SellToOpen,
    BuyToClose,
}

impl TradeAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SellToOpen => "SELL_TO_OPEN",
            Self::BuyToClose => "BUY_TO_CLOSE",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SELL_TO_OPEN" => Some(Self::SellToOpen),
            "BUY_TO_CLOSE" => Some(Self::BuyToClose),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
    Expired,
}

impl PositionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Expired => "EXPIRED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// An opposing crossover closed the position.
    CrossReversal,
    /// End-of-day forced close.
    ForcedClose,
    TakeProfit,
    StopLoss,
}

impl CloseReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrossReversal => "cross_reversal",
            Self::ForcedClose => "forced_close",
            Self::TakeProfit => "take_profit",
            Self::StopLoss => "stop_loss",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cross_reversal" => Some(Self::CrossReversal),
            "forced_close" => Some(Self::ForcedClose),
            "take_profit" => Some(Self::TakeProfit),
            "stop_loss" => Some(Self::StopLoss),
            _ => None,
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A short option position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Store-assigned id; `None` until persisted.
    pub id: Option<i64>,
    pub ticker: String,
    pub option_symbol: String,
    pub option_type: OptionRight,
    pub strike_price: Decimal,
    pub expiration_date: NaiveDate,
    pub action: TradeAction,
    pub contracts: i32,
    pub entry_price: Decimal,
    /// `entry_price * contracts * 100`.
    pub entry_credit: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Option<Decimal>,
    pub status: PositionStatus,
    pub close_reason: Option<CloseReason>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Builds a freshly sold position.
    ///
    /// # Errors
    /// Returns `InvalidPositionState` unless price and contracts are positive.
    pub fn open(
        contract: &OptionContract,
        option_symbol: String,
        contracts: i32,
        entry_price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        if contracts <= 0 || entry_price <= Decimal::ZERO {
            return Err(EngineError::invalid_position(format!(
                "cannot open {option_symbol} with {contracts} contracts at {entry_price}"
            )));
        }
        Ok(Self {
            id: None,
            ticker: contract.underlying.clone(),
            option_symbol,
            option_type: contract.right,
            strike_price: contract.strike,
            expiration_date: contract.expiry,
            action: TradeAction::SellToOpen,
            contracts,
            entry_price,
            entry_credit: notional(entry_price, contracts),
            current_price: entry_price,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: None,
            status: PositionStatus::Open,
            close_reason: None,
            created_at,
            closed_at: None,
        })
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Dollar cost of buying the whole position back at `current_price`.
    #[must_use]
    pub fn current_value(&self) -> Decimal {
        notional(self.current_price, self.contracts)
    }

    /// Refreshes the mark and the unrealized P&L.
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = self.entry_credit - self.current_value();
    }

    /// Transitions to CLOSED at `exit_price` and returns the realized P&L
    /// (`entry_credit - exit_debit`).
    ///
    /// # Errors
    /// Returns `InvalidPositionState` if the position is not open.
    pub fn close(
        &mut self,
        exit_price: Decimal,
        reason: CloseReason,
        closed_at: DateTime<Utc>,
    ) -> Result<Decimal, EngineError> {
        if !self.is_open() {
            return Err(EngineError::invalid_position(format!(
                "position {} ({}) is {}, cannot close",
                self.id.unwrap_or_default(),
                self.option_symbol,
                self.status.as_str()
            )));
        }
        self.mark(exit_price);
        let realized = self.entry_credit - notional(exit_price, self.contracts);
        self.realized_pnl = Some(realized);
        self.unrealized_pnl = Decimal::ZERO;
        self.status = PositionStatus::Closed;
        self.close_reason = Some(reason);
        self.closed_at = Some(closed_at);
        Ok(realized)
    }
}

/// Immutable record of one order leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub position_id: i64,
    pub option_symbol: String,
    pub action: TradeAction,
    pub contracts: i32,
    pub price: Decimal,
    /// Positive for credit received, negative for debit paid.
    pub credit_debit: Decimal,
    pub order_id: String,
    pub trade_timestamp: DateTime<Utc>,
    pub signal_timestamp: DateTime<Utc>,
}

impl Trade {
    #[must_use]
    pub fn sell_to_open(
        position: &Position,
        order_id: String,
        signal_timestamp: DateTime<Utc>,
        trade_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            position_id: position.id.unwrap_or_default(),
            option_symbol: position.option_symbol.clone(),
            action: TradeAction::SellToOpen,
            contracts: position.contracts,
            price: position.entry_price,
            credit_debit: position.entry_credit,
            order_id,
            trade_timestamp,
            signal_timestamp,
        }
    }

    #[must_use]
    pub fn buy_to_close(
        position: &Position,
        exit_price: Decimal,
        order_id: String,
        signal_timestamp: DateTime<Utc>,
        trade_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            position_id: position.id.unwrap_or_default(),
            option_symbol: position.option_symbol.clone(),
            action: TradeAction::BuyToClose,
            contracts: position.contracts,
            price: exit_price,
            credit_debit: -notional(exit_price, position.contracts),
            order_id,
            trade_timestamp,
            signal_timestamp,
        }
    }
}

fn notional(price: Decimal, contracts: i32) -> Decimal {
    price * Decimal::from(contracts) * CONTRACT_MULTIPLIER
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn put_position() -> Position {
        let contract = OptionContract::new(
            "QQQ",
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            dec!(597),
            OptionRight::Put,
        );
        let opened = Utc.with_ymd_and_hms(2025, 1, 17, 15, 0, 0).unwrap();
        Position::open(&contract, contract.symbol().unwrap(), 25, dec!(2.50), opened).unwrap()
    }

    #[test]
    fn entry_credit_is_price_times_contracts_times_multiplier() {
        let pos = put_position();
        assert_eq!(pos.entry_credit, dec!(6250.00));
        assert_eq!(pos.status, PositionStatus::Open);
        assert_eq!(pos.action, TradeAction::SellToOpen);
    }

    #[test]
    fn mark_tracks_short_side_pnl() {
        let mut pos = put_position();
        pos.mark(dec!(1.00));
        assert_eq!(pos.current_value(), dec!(2500.00));
        assert_eq!(pos.unrealized_pnl, dec!(3750.00));

        pos.mark(dec!(4.00));
        assert_eq!(pos.unrealized_pnl, dec!(-3750.00));
    }

    #[test]
    fn close_records_realized_pnl_and_refuses_twice() {
        let mut pos = put_position();
        let at = Utc.with_ymd_and_hms(2025, 1, 17, 19, 56, 0).unwrap();
        let realized = pos.close(dec!(0.75), CloseReason::ForcedClose, at).unwrap();
        assert_eq!(realized, dec!(4375.00));
        assert_eq!(pos.status, PositionStatus::Closed);
        assert_eq!(pos.close_reason, Some(CloseReason::ForcedClose));
        assert_eq!(pos.closed_at, Some(at));

        let again = pos.close(dec!(0.75), CloseReason::ForcedClose, at);
        assert!(matches!(again, Err(EngineError::InvalidPositionState(_))));
    }

    #[test]
    fn open_rejects_zero_price() {
        let contract = OptionContract::new(
            "QQQ",
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            dec!(597),
            OptionRight::Put,
        );
        let res = Position::open(&contract, "X".into(), 25, dec!(0), Utc::now());
        assert!(res.is_err());
    }

    #[test]
    fn closing_leg_is_a_debit() {
        let mut pos = put_position();
        pos.id = Some(7);
        let ts = Utc.with_ymd_and_hms(2025, 1, 17, 18, 0, 0).unwrap();
        let trade = Trade::buy_to_close(&pos, dec!(1.20), "A-1".into(), ts, ts);
        assert_eq!(trade.position_id, 7);
        assert_eq!(trade.action, TradeAction::BuyToClose);
        assert_eq!(trade.credit_debit, dec!(-3000.00));
    }
}
