//! Main service loop: one engine tick per poll interval during the session.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use zdte_core::{MarketData, OrderGateway, Store};

use crate::engine::{PositionLifecycleEngine, TickOutcome};

/// Run the engine until `shutdown` flips to `true`.
///
/// Shutdown is observed only between ticks, so a tick that has started
/// always finishes its broker and store work.
pub async fn run<M, G, S>(
    mut engine: PositionLifecycleEngine<M, G, S>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    M: MarketData,
    G: OrderGateway,
    S: Store,
{
    info!(
        ticker = engine.settings().ticker,
        contracts = engine.settings().contracts,
        poll_secs = poll_interval.as_secs(),
        "0DTE engine started"
    );

    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let now = Utc::now();
        if !engine.window().in_session(now) {
            debug!(local_time = %engine.window().local_time(now), "Outside session, idle");
            continue;
        }

        match engine.tick(now).await {
            Ok(outcome) => log_outcome(&outcome),
            Err(e) => error!(critical = e.requires_operator(), error = %e, "Tick aborted"),
        }
    }

    if engine.pending_write_count() > 0 {
        error!(
            critical = true,
            owed_writes = engine.pending_write_count(),
            "Shutting down with filled orders not persisted"
        );
    }
    info!("0DTE engine stopped");
    Ok(())
}

/// Logs everything a tick did at the severity it deserves.
pub fn log_outcome(outcome: &TickOutcome) {
    for pos in &outcome.opened {
        info!(
            symbol = pos.option_symbol,
            right = %pos.option_type,
            entry_credit = %pos.entry_credit,
            "Position opened"
        );
    }
    for pos in &outcome.closed {
        info!(
            symbol = pos.option_symbol,
            reason = pos.close_reason.map(|r| r.as_str()).unwrap_or("unknown"),
            realized_pnl = %pos.realized_pnl.unwrap_or_default(),
            "Position closed"
        );
    }
    for e in &outcome.errors {
        if e.requires_operator() {
            error!(critical = true, error = %e, "Operator attention required");
        } else if e.is_transient() {
            warn!(error = %e, "Transient failure, retrying next tick");
        } else {
            error!(error = %e, "Tick step failed");
        }
    }
}
