//! Position repository.
//!
//! Provides typed access to `zdte_positions`.

use anyhow::Result;
use sqlx::PgPool;

use crate::models::PositionRecord;

const COLUMNS: &str = "id, ticker, option_symbol, option_type, strike_price, expiration_date, \
     action, contracts, entry_price, entry_credit, current_price, unrealized_pnl, realized_pnl, \
     status, close_reason, created_at, closed_at";

/// Repository for position rows.
#[derive(Debug, Clone)]
pub struct PositionRepository {
    pool: PgPool,
}

impl PositionRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a position and returns the generated ID.
    ///
    /// # Errors
    /// Returns an error if the insert fails, including when another open
    /// position exists for the same ticker.
    pub async fn insert(&self, record: &PositionRecord) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO zdte_positions
                (ticker, option_symbol, option_type, strike_price, expiration_date, action,
                 contracts, entry_price, entry_credit, current_price, unrealized_pnl,
                 realized_pnl, status, close_reason, created_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id
            "#,
        )
        .bind(&record.ticker)
        .bind(&record.option_symbol)
        .bind(&record.option_type)
        .bind(record.strike_price)
        .bind(record.expiration_date)
        .bind(&record.action)
        .bind(record.contracts)
        .bind(record.entry_price)
        .bind(record.entry_credit)
        .bind(record.current_price)
        .bind(record.unrealized_pnl)
        .bind(record.realized_pnl)
        .bind(&record.status)
        .bind(&record.close_reason)
        .bind(record.created_at)
        .bind(record.closed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Writes the mutable columns back. Returns false if no row has this ID.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn update(&self, record: &PositionRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE zdte_positions
            SET current_price = $2, unrealized_pnl = $3, realized_pnl = $4,
                status = $5, close_reason = $6, closed_at = $7
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(record.current_price)
        .bind(record.unrealized_pnl)
        .bind(record.realized_pnl)
        .bind(&record.status)
        .bind(&record.close_reason)
        .bind(record.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Open positions for a ticker, oldest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn list_open(&self, ticker: &str) -> Result<Vec<PositionRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM zdte_positions WHERE ticker = $1 AND status = 'OPEN' ORDER BY created_at"
        );
        let records = sqlx::query_as::<_, PositionRecord>(&sql)
            .bind(ticker)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Most recent positions for a ticker regardless of status.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn list_recent(&self, ticker: &str, limit: i64) -> Result<Vec<PositionRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM zdte_positions WHERE ticker = $1 ORDER BY created_at DESC LIMIT $2"
        );
        let records = sqlx::query_as::<_, PositionRecord>(&sql)
            .bind(ticker)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Gets a position by ID.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<PositionRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM zdte_positions WHERE id = $1");
        let record = sqlx::query_as::<_, PositionRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }
}
