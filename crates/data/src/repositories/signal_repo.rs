//! Signal repository for the crossover audit table.

use anyhow::Result;
use sqlx::PgPool;

use crate::models::SignalRecord;

#[derive(Debug, Clone)]
pub struct SignalRepository {
    pool: PgPool,
}

impl SignalRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a crossover and returns the generated ID.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert(&self, record: &SignalRecord) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO zdte_signals (ticker, signal_timestamp, direction, price, sma9, vwap)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&record.ticker)
        .bind(record.signal_timestamp)
        .bind(&record.direction)
        .bind(record.price)
        .bind(record.sma9)
        .bind(record.vwap)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Latest crossovers for a ticker, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn recent(&self, ticker: &str, limit: i64) -> Result<Vec<SignalRecord>> {
        let records = sqlx::query_as::<_, SignalRecord>(
            r#"
            SELECT id, ticker, signal_timestamp, direction, price, sma9, vwap
            FROM zdte_signals
            WHERE ticker = $1
            ORDER BY signal_timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(ticker)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
