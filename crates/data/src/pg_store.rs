//! `Store` backed by the Postgres repositories.

use async_trait::async_trait;
use sqlx::PgPool;
use zdte_core::{CrossEvent, EngineError, Position, Store, Trade};

use crate::models::{PositionRecord, SignalRecord, TradeRecord};
use crate::repositories::Repositories;

#[derive(Debug, Clone)]
pub struct PgStore {
    repos: Repositories,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            repos: Repositories::new(pool),
        }
    }

    #[must_use]
    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }
}

fn persistence(e: anyhow::Error) -> EngineError {
    EngineError::persistence(format!("{e:#}"))
}

#[async_trait]
impl Store for PgStore {
    async fn get_open_positions(&self, ticker: &str) -> Result<Vec<Position>, EngineError> {
        let rows = self.repos.positions.list_open(ticker).await.map_err(persistence)?;
        rows.into_iter().map(Position::try_from).collect()
    }

    async fn create_position(&self, position: &Position) -> Result<i64, EngineError> {
        if position.id.is_some() {
            return Err(EngineError::invalid_position(format!(
                "{} already has an id",
                position.option_symbol
            )));
        }
        self.repos
            .positions
            .insert(&PositionRecord::from(position))
            .await
            .map_err(persistence)
    }

    async fn update_position(&self, position: &Position) -> Result<bool, EngineError> {
        if position.id.is_none() {
            return Ok(false);
        }
        self.repos
            .positions
            .update(&PositionRecord::from(position))
            .await
            .map_err(persistence)
    }

    async fn create_trade(&self, trade: &Trade) -> Result<i64, EngineError> {
        self.repos
            .trades
            .insert(&TradeRecord::from(trade))
            .await
            .map_err(persistence)
    }

    async fn create_signal(&self, event: &CrossEvent) -> Result<i64, EngineError> {
        self.repos
            .signals
            .insert(&SignalRecord::from(event))
            .await
            .map_err(persistence)
    }
}
