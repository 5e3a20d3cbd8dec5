//! In-process `Store` used by replay and tests.
//!
//! Mirrors the Postgres constraints that matter to the engine: one open
//! position per ticker, and trades must reference an existing position.

use async_trait::async_trait;
use tokio::sync::Mutex;
use zdte_core::{CrossEvent, EngineError, Position, Store, Trade};

#[derive(Debug, Default)]
struct State {
    positions: Vec<Position>,
    trades: Vec<Trade>,
    signals: Vec<CrossEvent>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every position ever created, in creation order.
    pub async fn positions(&self) -> Vec<Position> {
        self.state.lock().await.positions.clone()
    }

    pub async fn trades(&self) -> Vec<Trade> {
        self.state.lock().await.trades.clone()
    }

    pub async fn signals(&self) -> Vec<CrossEvent> {
        self.state.lock().await.signals.clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_open_positions(&self, ticker: &str) -> Result<Vec<Position>, EngineError> {
        let state = self.state.lock().await;
        Ok(state
            .positions
            .iter()
            .filter(|p| p.ticker == ticker && p.is_open())
            .cloned()
            .collect())
    }

    async fn create_position(&self, position: &Position) -> Result<i64, EngineError> {
        let mut state = self.state.lock().await;
        if position.id.is_some() {
            return Err(EngineError::invalid_position(format!(
                "{} already has an id",
                position.option_symbol
            )));
        }
        if position.is_open()
            && state
                .positions
                .iter()
                .any(|p| p.ticker == position.ticker && p.is_open())
        {
            return Err(EngineError::persistence(format!(
                "open position already exists for {}",
                position.ticker
            )));
        }
        let id = i64::try_from(state.positions.len()).unwrap_or(i64::MAX - 1) + 1;
        let mut stored = position.clone();
        stored.id = Some(id);
        state.positions.push(stored);
        Ok(id)
    }

    async fn update_position(&self, position: &Position) -> Result<bool, EngineError> {
        let mut state = self.state.lock().await;
        let Some(id) = position.id else {
            return Ok(false);
        };
        match state.positions.iter_mut().find(|p| p.id == Some(id)) {
            Some(slot) => {
                *slot = position.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_trade(&self, trade: &Trade) -> Result<i64, EngineError> {
        let mut state = self.state.lock().await;
        if !state.positions.iter().any(|p| p.id == Some(trade.position_id)) {
            return Err(EngineError::persistence(format!(
                "trade references unknown position {}",
                trade.position_id
            )));
        }
        state.trades.push(trade.clone());
        Ok(i64::try_from(state.trades.len()).unwrap_or(i64::MAX))
    }

    async fn create_signal(&self, event: &CrossEvent) -> Result<i64, EngineError> {
        let mut state = self.state.lock().await;
        state.signals.push(event.clone());
        Ok(i64::try_from(state.signals.len()).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use zdte_core::{CloseReason, OptionContract, OptionRight};

    fn put(strike: rust_decimal::Decimal) -> Position {
        let contract = OptionContract::new(
            "QQQ",
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            strike,
            OptionRight::Put,
        );
        let at = Utc.with_ymd_and_hms(2025, 1, 17, 15, 0, 0).unwrap();
        Position::open(&contract, contract.symbol().unwrap(), 25, dec!(1.20), at).unwrap()
    }

    #[tokio::test]
    async fn test_second_open_position_is_refused() {
        let store = InMemoryStore::new();
        store.create_position(&put(dec!(597))).await.unwrap();

        let err = store.create_position(&put(dec!(596))).await.unwrap_err();
        assert!(matches!(err, EngineError::Persistence(_)));
        assert_eq!(store.get_open_positions("QQQ").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_position_leaves_open_list() {
        let store = InMemoryStore::new();
        let mut pos = put(dec!(597));
        pos.id = Some(store.create_position(&pos).await.unwrap());

        pos.close(dec!(0.50), CloseReason::TakeProfit, pos.created_at).unwrap();
        assert!(store.update_position(&pos).await.unwrap());

        assert!(store.get_open_positions("QQQ").await.unwrap().is_empty());
        assert!(store.create_position(&put(dec!(596))).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_unknown_position_matches_nothing() {
        let store = InMemoryStore::new();
        let mut pos = put(dec!(597));
        pos.id = Some(42);
        assert!(!store.update_position(&pos).await.unwrap());
    }

    #[tokio::test]
    async fn test_trade_requires_position() {
        let store = InMemoryStore::new();
        let mut pos = put(dec!(597));
        pos.id = Some(9);
        let trade = Trade::sell_to_open(&pos, "PAPER-1".into(), pos.created_at, pos.created_at);

        assert!(store.create_trade(&trade).await.is_err());
    }
}
