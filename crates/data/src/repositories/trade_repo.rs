//! Trade repository for the `zdte_trades` order-leg log.

use anyhow::Result;
use sqlx::PgPool;

use crate::models::TradeRecord;

#[derive(Debug, Clone)]
pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a trade leg and returns the generated ID.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert(&self, record: &TradeRecord) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO zdte_trades
                (position_id, option_symbol, action, contracts, price, credit_debit,
                 order_id, trade_timestamp, signal_timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(record.position_id)
        .bind(&record.option_symbol)
        .bind(&record.action)
        .bind(record.contracts)
        .bind(record.price)
        .bind(record.credit_debit)
        .bind(&record.order_id)
        .bind(record.trade_timestamp)
        .bind(record.signal_timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// All legs of one position in execution order.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn list_for_position(&self, position_id: i64) -> Result<Vec<TradeRecord>> {
        let records = sqlx::query_as::<_, TradeRecord>(
            r#"
            SELECT id, position_id, option_symbol, action, contracts, price, credit_debit,
                   order_id, trade_timestamp, signal_timestamp
            FROM zdte_trades
            WHERE position_id = $1
            ORDER BY trade_timestamp, id
            "#,
        )
        .bind(position_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
