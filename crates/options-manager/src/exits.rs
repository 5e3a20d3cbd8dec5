//! Profit-target and stop-loss rules for short option positions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zdte_core::{EngineError, ExitConfig, Position};

/// Outcome of evaluating an open position against its exit thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitDecision {
    Hold,
    TakeProfit,
    StopLoss,
}

/// Classifies P&L as a fraction of the entry credit.
#[derive(Debug, Clone)]
pub struct ExitRuleEvaluator {
    take_profit_fraction: Decimal,
    stop_loss_fraction: Decimal,
}

impl Default for ExitRuleEvaluator {
    fn default() -> Self {
        Self::new(&ExitConfig::default())
    }
}

impl ExitRuleEvaluator {
    #[must_use]
    pub fn new(config: &ExitConfig) -> Self {
        Self {
            take_profit_fraction: config.take_profit_fraction,
            stop_loss_fraction: config.stop_loss_fraction,
        }
    }

    /// `take_profit` at `pnl_fraction >= take_profit_fraction`, `stop_loss` at
    /// `pnl_fraction <= -stop_loss_fraction`, `hold` otherwise.
    ///
    /// # Errors
    /// Returns `InvalidPositionState` when the entry credit is not positive.
    pub fn evaluate(&self, pos: &Position) -> Result<ExitDecision, EngineError> {
        let fraction = pnl_fraction(pos)?;

        if fraction >= self.take_profit_fraction {
            tracing::info!(
                symbol = pos.option_symbol,
                pnl_fraction = %fraction,
                threshold = %self.take_profit_fraction,
                "Profit target hit"
            );
            return Ok(ExitDecision::TakeProfit);
        }

        if fraction <= -self.stop_loss_fraction {
            tracing::warn!(
                symbol = pos.option_symbol,
                pnl_fraction = %fraction,
                threshold = %self.stop_loss_fraction,
                "Stop loss triggered"
            );
            return Ok(ExitDecision::StopLoss);
        }

        Ok(ExitDecision::Hold)
    }
}

/// `(entry_credit - current_value) / entry_credit`.
///
/// # Errors
/// Returns `InvalidPositionState` when the entry credit is not positive.
pub fn pnl_fraction(pos: &Position) -> Result<Decimal, EngineError> {
    if pos.entry_credit <= Decimal::ZERO {
        return Err(EngineError::invalid_position(format!(
            "position {} has entry credit {}",
            pos.option_symbol, pos.entry_credit
        )));
    }
    let pnl = pos.entry_credit - pos.current_value();
    Ok(pnl / pos.entry_credit)
}
