//! Database repositories for the 0DTE engine tables.

pub mod position_repo;
pub mod signal_repo;
pub mod trade_repo;

pub use position_repo::PositionRepository;
pub use signal_repo::SignalRepository;
pub use trade_repo::TradeRepository;

use sqlx::PgPool;

/// Creates all repositories from a single database pool.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub positions: PositionRepository,
    pub trades: TradeRepository,
    pub signals: SignalRepository,
}

impl Repositories {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            positions: PositionRepository::new(pool.clone()),
            trades: TradeRepository::new(pool.clone()),
            signals: SignalRepository::new(pool),
        }
    }
}
