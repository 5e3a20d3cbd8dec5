//! Paper trading execution shim.
//!
//! Fills every order at its limit price without touching the broker.
//! Used by `--paper` runs and by replay.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use zdte_core::{EngineError, OrderGateway, OrderRequest};

/// Per-contract commission applied to simulated fills.
pub const PAPER_COMMISSION_PER_CONTRACT: Decimal = dec!(0.65);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFill {
    pub order_id: String,
    pub order: OrderRequest,
    pub fill_price: Decimal,
    pub commission: Decimal,
    pub filled_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PaperGateway {
    next_id: AtomicU64,
    fills: Mutex<Vec<PaperFill>>,
}

impl PaperGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every simulated fill, in submission order.
    #[must_use]
    pub fn fills(&self) -> Vec<PaperFill> {
        self.fills.lock().clone()
    }

    /// Total commission charged so far.
    #[must_use]
    pub fn total_commission(&self) -> Decimal {
        self.fills.lock().iter().map(|f| f.commission).sum()
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn submit(&self, order: &OrderRequest) -> Result<String, EngineError> {
        if order.contracts <= 0 || order.limit_price <= Decimal::ZERO {
            return Err(EngineError::OrderRejected(format!(
                "paper order for {} has {} contracts at {}",
                order.option_symbol, order.contracts, order.limit_price
            )));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let fill = PaperFill {
            order_id: format!("PAPER-{n}"),
            order: order.clone(),
            fill_price: order.limit_price,
            commission: PAPER_COMMISSION_PER_CONTRACT * Decimal::from(order.contracts),
            filled_at: Utc::now(),
        };

        info!(
            order_id = fill.order_id,
            symbol = order.option_symbol,
            instruction = %order.instruction,
            price = %fill.fill_price,
            quantity = order.contracts,
            "Paper fill simulated"
        );

        let order_id = fill.order_id.clone();
        self.fills.lock().push(fill);
        Ok(order_id)
    }
}
