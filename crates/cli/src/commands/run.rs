//! Live engine command.
//!
//! Wires the Schwab market data adapter, an order gateway (live or paper) and
//! the Postgres store into one engine, then drives it until SIGINT/SIGTERM.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::watch;
use tracing::{info, warn};
use zdte_core::{AppConfig, OrderGateway};
use zdte_data::{DatabaseClient, PgStore};
use zdte_options_manager::{service, PositionLifecycleEngine};
use zdte_schwab::{
    PaperGateway, SchwabClient, SchwabClientConfig, SchwabMarketData, SchwabOrderGateway,
};

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Profile overlay (loads Config.<profile>.toml on top)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Simulate fills instead of sending orders to the broker
    #[arg(long)]
    pub paper: bool,
}

/// Runs the live engine.
///
/// # Errors
/// Returns an error if configuration, the database or the brokerage client
/// cannot be initialised.
pub async fn run_engine(args: RunArgs) -> Result<()> {
    let config = super::load_config(&args.config, args.profile.as_deref())?;

    let database = DatabaseClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    let store = PgStore::new(database.pool().clone());

    let client = SchwabClient::new(SchwabClientConfig::from_app(
        &config.schwab,
        config.trading.call_timeout_secs,
    ))
    .context("Failed to build Schwab client")?;
    let market = SchwabMarketData::new(client.clone());

    if args.paper {
        info!("Paper trading: orders are simulated locally");
        serve(market, PaperGateway::new(), store, &config).await
    } else {
        if config.trading.account_id.is_empty() {
            warn!("trading.account_id is empty; orders are routed by schwab.account_hash only");
        }
        serve(market, SchwabOrderGateway::new(client), store, &config).await
    }
}

async fn serve<G: OrderGateway>(
    market: SchwabMarketData,
    gateway: G,
    store: PgStore,
    config: &AppConfig,
) -> Result<()> {
    let engine = PositionLifecycleEngine::from_config(market, gateway, store, config);
    let poll_interval = Duration::from_secs(config.trading.poll_interval_secs.max(1));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown requested, finishing current tick");
        let _ = shutdown_tx.send(true);
    });

    service::run(engine, poll_interval, shutdown_rx).await
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT (Ctrl+C)"),
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
