//! Replay CLI command.
//!
//! Drives the real engine one tick per recorded bar, with simulated fills and
//! an in-memory store, and reports what it traded.

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use tracing::{info, warn};
use zdte_core::{AppConfig, Position, PriceSample, Trade};
use zdte_data::{CsvStorage, InMemoryStore, QuoteSnapshot};
use zdte_options_manager::{service, PositionLifecycleEngine};
use zdte_schwab::{PaperGateway, ReplayMarket};

/// Arguments for the replay command.
#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Minute bars CSV (timestamp,ticker,price|close,volume)
    #[arg(long)]
    pub bars: String,

    /// Option quotes CSV (timestamp,underlying,expiry,strike,right,bid,ask,last)
    #[arg(long)]
    pub quotes: String,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Write executed trades to this CSV file
    #[arg(long)]
    pub trades_out: Option<String>,
}

/// What a replay produced.
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub ticks: usize,
    pub crosses: usize,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub realized_pnl: Decimal,
    pub commission: Decimal,
    pub halted: Option<String>,
}

impl ReplaySummary {
    pub fn still_open(&self) -> usize {
        self.positions.iter().filter(|p| p.is_open()).count()
    }
}

/// Runs the replay command.
///
/// # Errors
/// Returns an error if the configuration or either CSV file cannot be read,
/// or the trades file cannot be written.
pub async fn run_replay(args: ReplayArgs) -> Result<()> {
    let config = super::load_config(&args.config, None)?;
    let bars = CsvStorage::read_bars(&args.bars)?;
    let quotes = CsvStorage::read_quotes(&args.quotes)?;
    info!(bars = bars.len(), quotes = quotes.len(), "Loaded replay data");

    let summary = replay_session(&config, bars, quotes).await?;
    print_summary(&summary);

    if let Some(path) = &args.trades_out {
        CsvStorage::write_trades(path, &summary.trades)
            .with_context(|| format!("Failed to write trades to {path}"))?;
        println!("Trades written to {path}");
    }
    Ok(())
}

/// Ticks the engine at every in-session bar timestamp.
///
/// A tick that cannot start is logged and the replay moves on, as the live
/// service would.
pub async fn replay_session(
    config: &AppConfig,
    bars: Vec<PriceSample>,
    quotes: Vec<QuoteSnapshot>,
) -> Result<ReplaySummary> {
    let market = ReplayMarket::new(bars, quotes);
    let mut engine =
        PositionLifecycleEngine::from_config(market, PaperGateway::new(), InMemoryStore::new(), config);

    let mut ticks = 0;
    let mut crosses = 0;
    for now in engine.market().bar_times() {
        if !engine.window().in_session(now) {
            continue;
        }
        engine.market().set_clock(now);
        ticks += 1;
        match engine.tick(now).await {
            Ok(outcome) => {
                if outcome.cross.is_some() {
                    crosses += 1;
                }
                service::log_outcome(&outcome);
            }
            Err(e) => warn!(time = %now, error = %e, "Replay tick aborted"),
        }
    }

    if engine.pending_write_count() > 0 {
        warn!(owed_writes = engine.pending_write_count(), "Replay ended with unflushed writes");
    }

    let positions = engine.store().positions().await;
    let trades = engine.store().trades().await;
    let realized_pnl = positions.iter().filter_map(|p| p.realized_pnl).sum();

    Ok(ReplaySummary {
        ticks,
        crosses,
        positions,
        trades,
        realized_pnl,
        commission: engine.gateway().total_commission(),
        halted: engine.halt_reason().map(str::to_string),
    })
}

fn print_summary(summary: &ReplaySummary) {
    println!("\n=== Replay Summary ===\n");
    println!("Ticks:        {}", summary.ticks);
    println!("Crosses:      {}", summary.crosses);
    println!("Positions:    {}", summary.positions.len());
    println!("Trades:       {}", summary.trades.len());
    println!();
    println!(
        "{:<24} {:>5} {:>8} {:>10} {:>10} {:<15}",
        "Symbol", "Right", "Strike", "Credit", "P&L", "Reason"
    );
    println!("{}", "-".repeat(77));
    for pos in &summary.positions {
        println!(
            "{:<24} {:>5} {:>8} {:>10} {:>10} {:<15}",
            pos.option_symbol,
            pos.option_type.as_str(),
            pos.strike_price,
            pos.entry_credit.round_dp(2),
            pos.realized_pnl
                .map_or_else(|| "open".to_string(), |p| p.round_dp(2).to_string()),
            pos.close_reason.map_or("-", |r| r.as_str()),
        );
    }
    println!();
    println!("Realized P&L: {}", summary.realized_pnl.round_dp(2));
    println!("Commission:   {}", summary.commission.round_dp(2));
    println!(
        "Net:          {}",
        (summary.realized_pnl - summary.commission).round_dp(2)
    );
    if summary.still_open() > 0 {
        println!("WARNING: {} position(s) still open at end of data", summary.still_open());
    }
    if let Some(reason) = &summary.halted {
        println!("WARNING: entries halted: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use zdte_core::{CloseReason, OptionContract, OptionQuote, OptionRight};

    // 09:30 America/New_York on 2025-01-17.
    fn minute(m: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 17, 14, 30, 0).unwrap() + Duration::minutes(m)
    }

    fn bars(prices: &[Decimal]) -> Vec<PriceSample> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceSample::new("QQQ", minute(i as i64), *p, 1000))
            .collect()
    }

    fn put_quote(strike: Decimal, bid: Decimal, ask: Decimal) -> QuoteSnapshot {
        let contract = OptionContract::new(
            "QQQ",
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            strike,
            OptionRight::Put,
        );
        QuoteSnapshot {
            timestamp: minute(0),
            quote: OptionQuote {
                symbol: contract.symbol().unwrap(),
                bid,
                ask,
                last: bid,
            },
            contract,
        }
    }

    #[tokio::test]
    async fn test_down_cross_then_forced_close() {
        // Flat open, one down tick, then flat through the forced-close band.
        let mut prices = vec![dec!(600); 10];
        prices.extend(std::iter::repeat(dec!(599)).take(330));
        let quotes = vec![put_quote(dec!(599), dec!(1.20), dec!(1.25))];

        let summary = replay_session(&AppConfig::default(), bars(&prices), quotes)
            .await
            .unwrap();

        assert_eq!(summary.crosses, 1);
        assert_eq!(summary.positions.len(), 1);
        assert_eq!(summary.still_open(), 0);
        let pos = &summary.positions[0];
        assert_eq!(pos.strike_price, dec!(599));
        assert_eq!(pos.close_reason, Some(CloseReason::ForcedClose));
        assert_eq!(summary.realized_pnl, dec!(-125));
        assert_eq!(summary.trades.len(), 2);
        assert_eq!(summary.commission, dec!(32.50));
        assert!(summary.halted.is_none());
    }

    #[tokio::test]
    async fn test_bars_outside_session_are_not_ticked() {
        let mut samples = bars(&[dec!(600); 5]);
        samples.push(PriceSample::new("QQQ", minute(-60), dec!(600), 1000));

        let summary = replay_session(&AppConfig::default(), samples, Vec::new())
            .await
            .unwrap();

        assert_eq!(summary.ticks, 5);
        assert!(summary.positions.is_empty());
    }
}
