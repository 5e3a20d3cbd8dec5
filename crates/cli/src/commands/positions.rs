//! Positions listing command.
//!
//! Reads `zdte_positions` (and optionally the trades and signals tables) for
//! one ticker. Read-only: never touches the broker.

use anyhow::{Context, Result};
use clap::Args;
use zdte_data::{DatabaseClient, PositionRecord, Repositories};

/// Arguments for the positions command.
#[derive(Args, Debug, Clone)]
pub struct PositionsArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Ticker to list (defaults to trading.ticker)
    #[arg(long)]
    pub ticker: Option<String>,

    /// Also list this many most recent positions of any status
    #[arg(long, default_value = "0")]
    pub recent: i64,

    /// Show the order legs of each listed position
    #[arg(long)]
    pub trades: bool,

    /// Show this many most recent crossover signals
    #[arg(long, default_value = "0")]
    pub signals: i64,
}

/// Runs the positions command.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or a query fails.
pub async fn run_positions(args: PositionsArgs) -> Result<()> {
    let config = super::load_config(&args.config, None)?;
    let ticker = args
        .ticker
        .unwrap_or_else(|| config.trading.ticker.clone())
        .to_uppercase();

    let database = DatabaseClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    let repos = Repositories::new(database.pool().clone());

    let open = repos.positions.list_open(&ticker).await?;
    println!("\n=== Open {} positions ({}) ===\n", ticker, open.len());
    print_positions(&open);
    if args.trades {
        print_trades(&repos, &open).await?;
    }

    if args.recent > 0 {
        let recent = repos.positions.list_recent(&ticker, args.recent).await?;
        println!("\n=== Recent {} positions ({}) ===\n", ticker, recent.len());
        print_positions(&recent);
        if args.trades {
            print_trades(&repos, &recent).await?;
        }
    }

    if args.signals > 0 {
        let signals = repos.signals.recent(&ticker, args.signals).await?;
        println!("\n=== Recent {} signals ({}) ===\n", ticker, signals.len());
        for s in &signals {
            println!(
                "{}  {:<5} price {:>9}  sma9 {:>10}  vwap {:>10}",
                s.signal_timestamp.format("%Y-%m-%d %H:%M:%S"),
                s.direction,
                s.price.round_dp(2),
                s.sma9.round_dp(4),
                s.vwap.round_dp(4)
            );
        }
    }

    Ok(())
}

fn print_positions(records: &[PositionRecord]) {
    if records.is_empty() {
        println!("(none)");
        return;
    }
    println!(
        "{:>6} {:<24} {:<5} {:>8} {:>5} {:>10} {:>10} {:>10} {:<7} {:<15}",
        "ID", "Symbol", "Right", "Strike", "Qty", "Credit", "Mark", "P&L", "Status", "Reason"
    );
    println!("{}", "-".repeat(112));
    for r in records {
        let pnl = r.realized_pnl.unwrap_or(r.unrealized_pnl);
        println!(
            "{:>6} {:<24} {:<5} {:>8} {:>5} {:>10} {:>10} {:>10} {:<7} {:<15}",
            r.id,
            r.option_symbol,
            r.option_type,
            r.strike_price,
            r.contracts,
            r.entry_credit.round_dp(2),
            r.current_price.round_dp(2),
            pnl.round_dp(2),
            r.status,
            r.close_reason.as_deref().unwrap_or("-"),
        );
    }
}

async fn print_trades(repos: &Repositories, records: &[PositionRecord]) -> Result<()> {
    for r in records {
        let trades = repos.trades.list_for_position(r.id).await?;
        for t in &trades {
            println!(
                "  #{:<5} {} {:<13} {:>4} @ {:>6} = {:>10}  order {}",
                r.id,
                t.trade_timestamp.format("%H:%M:%S"),
                t.action,
                t.contracts,
                t.price.round_dp(2),
                t.credit_debit.round_dp(2),
                t.order_id
            );
        }
    }
    Ok(())
}
