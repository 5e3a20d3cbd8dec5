//! Position lifecycle state machine for one ticker.
//!
//! Each call to [`PositionLifecycleEngine::tick`] runs, in order:
//! 1. Flush writes whose broker side already happened (open or close fills).
//! 2. Mark open positions to market.
//! 3. Forced close (from the start of the forced-close band) or exit rules.
//! 4. Crossover evaluation and the resulting open/close actions.
//!
//! While owed writes cannot be flushed the tick stops after step 1, except
//! inside the forced-close band, where step 3 still runs against the store
//! rows and the owed open fills.
//!
//! A tick takes `&mut self`, so two ticks for the same ticker can never
//! interleave.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use zdte_core::{
    AppConfig, CloseReason, CrossDirection, CrossEvent, EngineError, MarketData, OptionContract,
    OptionRight, OrderGateway, OrderRequest, Position, Store, Trade, TradeAction,
};
use zdte_strategy::{normalize_series, CrossDetector, IndicatorCalculator, SMA_PERIOD};

use crate::exits::{ExitDecision, ExitRuleEvaluator};
use crate::strikes::select_strike;
use crate::window::TradingWindowPolicy;

/// Per-ticker engine parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub ticker: String,
    pub account_id: String,
    pub contracts: i32,
    pub lookback_bars: usize,
    pub call_timeout: Duration,
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ticker: config.trading.ticker.to_uppercase(),
            account_id: config.trading.account_id.clone(),
            contracts: config.trading.contracts,
            lookback_bars: config.trading.lookback_bars,
            call_timeout: Duration::from_secs(config.trading.call_timeout_secs),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Fresh crossover processed this tick, if any.
    pub cross: Option<CrossEvent>,
    pub opened: Vec<Position>,
    pub closed: Vec<Position>,
    /// Failures that did not abort the tick.
    pub errors: Vec<EngineError>,
}

impl TickOutcome {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.cross.is_none() && self.opened.is_empty() && self.closed.is_empty() && self.errors.is_empty()
    }
}

/// Store writes owed for orders the broker already filled.
#[derive(Debug, Clone)]
struct PendingWrite {
    position: Position,
    /// Legs not yet inserted, oldest first.
    trades: Vec<Trade>,
    /// Set once the position row reflects `position`.
    position_saved: bool,
}

pub struct PositionLifecycleEngine<M, G, S>
where
    M: MarketData,
    G: OrderGateway,
    S: Store,
{
    market: M,
    gateway: G,
    store: S,
    settings: EngineSettings,
    calculator: IndicatorCalculator,
    detector: CrossDetector,
    window: TradingWindowPolicy,
    exits: ExitRuleEvaluator,
    pending_writes: VecDeque<PendingWrite>,
    /// Entry that failed transiently and is retried while still valid.
    pending_entry: Option<CrossEvent>,
    /// Up cross whose reversal close failed transiently; close and call entry
    /// are replayed on later ticks.
    pending_reversal: Option<CrossEvent>,
    last_signal_at: Option<DateTime<Utc>>,
    /// Symbols with a close order in unknown state; never resubmitted.
    unconfirmed_closes: HashSet<String>,
    halted: Option<String>,
}

impl<M, G, S> PositionLifecycleEngine<M, G, S>
where
    M: MarketData,
    G: OrderGateway,
    S: Store,
{
    #[must_use]
    pub fn new(
        market: M,
        gateway: G,
        store: S,
        settings: EngineSettings,
        detector: CrossDetector,
        window: TradingWindowPolicy,
        exits: ExitRuleEvaluator,
    ) -> Self {
        let calculator = IndicatorCalculator::new(SMA_PERIOD, window.timezone());
        Self {
            market,
            gateway,
            store,
            settings,
            calculator,
            detector,
            window,
            exits,
            pending_writes: VecDeque::new(),
            pending_entry: None,
            pending_reversal: None,
            last_signal_at: None,
            unconfirmed_closes: HashSet::new(),
            halted: None,
        }
    }

    /// Builds an engine with every policy taken from `config`.
    #[must_use]
    pub fn from_config(market: M, gateway: G, store: S, config: &AppConfig) -> Self {
        Self::new(
            market,
            gateway,
            store,
            EngineSettings::from_config(config),
            CrossDetector::new(config.trading.cross_rule),
            TradingWindowPolicy::new(config.window.clone()),
            ExitRuleEvaluator::new(&config.exits),
        )
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn window(&self) -> &TradingWindowPolicy {
        &self.window
    }

    #[must_use]
    pub fn market(&self) -> &M {
        &self.market
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reason entries are suspended, if they are.
    #[must_use]
    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    /// Number of store writes still owed for filled orders.
    #[must_use]
    pub fn pending_write_count(&self) -> usize {
        self.pending_writes.len()
    }

    /// Runs one evaluation tick at `now`.
    ///
    /// # Errors
    /// Returns an error only when the tick could not start: owed writes could
    /// not be flushed outside the forced-close band, or open positions could
    /// not be read. Everything else is reported in [`TickOutcome::errors`].
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, EngineError> {
        if let Err(e) = self.flush_pending_writes().await {
            if !self.window.force_close_started(now) {
                return Err(e);
            }
            return Ok(self.force_close_with_owed_writes(e, now).await);
        }

        let mut outcome = TickOutcome::default();
        let open = self.load_open_positions().await?;
        let mut open = self.mark_to_market(open, &mut outcome).await;

        if self.window.force_close_started(now) {
            self.force_close(&mut open, now, &mut outcome).await;
        } else {
            self.apply_exit_rules(&mut open, now, &mut outcome).await;
        }

        match self.fresh_cross().await {
            Ok(Some(event)) => {
                self.record_signal(&event, &mut outcome).await;
                self.pending_entry = None;
                self.pending_reversal = None;
                outcome.cross = Some(event.clone());
                self.handle_cross(&event, &open, now, &mut outcome).await;
            }
            Ok(None) => {
                if let Some(event) = self.pending_reversal.take() {
                    debug!(signal_at = %event.timestamp, "Retrying reversal close");
                    self.handle_cross(&event, &open, now, &mut outcome).await;
                } else if let Some(event) = self.pending_entry.take() {
                    debug!(direction = %event.direction, "Retrying pending entry");
                    let right = entry_right(event.direction);
                    self.try_open(right, &event, now, &mut outcome).await;
                }
            }
            Err(e) => {
                warn!(ticker = self.settings.ticker, error = %e, "Signal evaluation aborted for this tick");
                outcome.errors.push(e);
            }
        }

        Ok(outcome)
    }

    /// Forced close while owed writes are stuck. Candidates are the open
    /// store rows plus open fills only held in memory; symbols whose close
    /// fill is already owed are skipped. Entries stay blocked.
    async fn force_close_with_owed_writes(&mut self, flush_error: EngineError, now: DateTime<Utc>) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        outcome.errors.push(flush_error);

        let mut open = match self.load_open_positions().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Store unreadable, forced close uses owed fills only");
                outcome.errors.push(e);
                Vec::new()
            }
        };
        open.retain(|row| {
            !self
                .pending_writes
                .iter()
                .any(|w| !w.position.is_open() && w.position.option_symbol == row.option_symbol)
        });
        for owed in &self.pending_writes {
            if owed.position.is_open() && !open.iter().any(|p| p.option_symbol == owed.position.option_symbol) {
                open.push(owed.position.clone());
            }
        }

        self.force_close(&mut open, now, &mut outcome).await;
        outcome
    }

    async fn load_open_positions(&self) -> Result<Vec<Position>, EngineError> {
        timed(
            self.settings.call_timeout,
            "get_open_positions",
            self.store.get_open_positions(&self.settings.ticker),
        )
        .await
    }

    async fn mark_to_market(&self, open: Vec<Position>, outcome: &mut TickOutcome) -> Vec<Position> {
        let mut marked = Vec::with_capacity(open.len());
        for mut pos in open {
            let quote = timed(
                self.settings.call_timeout,
                "option_quote",
                self.market.option_quote(&pos.option_symbol),
            )
            .await;
            match quote.and_then(|q| {
                q.buy_price()
                    .ok_or_else(|| EngineError::quote_unavailable(&q.symbol, "no ask or last"))
            }) {
                Ok(price) => {
                    pos.mark(price);
                    match timed(
                        self.settings.call_timeout,
                        "update_position",
                        self.store.update_position(&pos),
                    )
                    .await
                    {
                        Ok(true) => {}
                        Ok(false) => warn!(symbol = pos.option_symbol, "Mark update matched no row"),
                        Err(e) => {
                            warn!(symbol = pos.option_symbol, error = %e, "Failed to persist mark");
                            outcome.errors.push(e);
                        }
                    }
                    debug!(
                        symbol = pos.option_symbol,
                        price = %price,
                        unrealized_pnl = %pos.unrealized_pnl,
                        "Position marked"
                    );
                }
                Err(e) => {
                    warn!(symbol = pos.option_symbol, error = %e, "Keeping stale mark");
                    outcome.errors.push(e);
                }
            }
            marked.push(pos);
        }
        marked
    }

    async fn force_close(&mut self, open: &mut Vec<Position>, now: DateTime<Utc>, outcome: &mut TickOutcome) {
        if open.is_empty() {
            return;
        }
        let overdue = self.window.force_close_overdue(now);
        let mut still_open = Vec::new();
        for pos in open.drain(..) {
            info!(symbol = pos.option_symbol, overdue, "Forced end-of-day close");
            match self.close_position(pos.clone(), CloseReason::ForcedClose, now, now).await {
                Ok(closed) => outcome.closed.push(closed),
                Err(e) => {
                    error!(
                        critical = true,
                        symbol = pos.option_symbol,
                        error = %e,
                        "FORCED CLOSE FAILED: 0DTE short option still open, retrying next tick"
                    );
                    outcome.errors.push(e);
                    still_open.push(pos);
                }
            }
        }
        if overdue && !still_open.is_empty() {
            error!(
                critical = true,
                open_positions = still_open.len(),
                "Positions remain open after the forced-close band; operator action required"
            );
        }
        *open = still_open;
    }

    async fn apply_exit_rules(&mut self, open: &mut Vec<Position>, now: DateTime<Utc>, outcome: &mut TickOutcome) {
        let mut still_open = Vec::new();
        for pos in open.drain(..) {
            let reason = match self.exits.evaluate(&pos) {
                Ok(ExitDecision::Hold) => None,
                Ok(ExitDecision::TakeProfit) => Some(CloseReason::TakeProfit),
                Ok(ExitDecision::StopLoss) => Some(CloseReason::StopLoss),
                Err(e) => {
                    error!(symbol = pos.option_symbol, error = %e, "Exit rule evaluation failed");
                    outcome.errors.push(e);
                    None
                }
            };
            let Some(reason) = reason else {
                still_open.push(pos);
                continue;
            };
            match self.close_position(pos.clone(), reason, now, now).await {
                Ok(closed) => outcome.closed.push(closed),
                Err(e) => {
                    warn!(symbol = pos.option_symbol, %reason, error = %e, "Exit close failed, retrying next tick");
                    outcome.errors.push(e);
                    still_open.push(pos);
                }
            }
        }
        *open = still_open;
    }

    /// Computes indicators over the trailing window and returns the cross on
    /// the newest bar, unless it was already handled.
    async fn fresh_cross(&mut self) -> Result<Option<CrossEvent>, EngineError> {
        let bars = timed(
            self.settings.call_timeout,
            "recent_bars",
            self.market
                .recent_bars(&self.settings.ticker, self.settings.lookback_bars),
        )
        .await?;
        let series = normalize_series(bars);
        let samples = self.calculator.compute(&series)?;
        let Some(event) = self.detector.latest(&samples) else {
            return Ok(None);
        };
        if self.last_signal_at == Some(event.timestamp) {
            return Ok(None);
        }
        self.last_signal_at = Some(event.timestamp);
        info!(
            ticker = event.ticker,
            direction = %event.direction,
            price = %event.price,
            sma9 = %event.sma9,
            vwap = %event.vwap,
            "Crossover detected"
        );
        Ok(Some(event))
    }

    async fn record_signal(&self, event: &CrossEvent, outcome: &mut TickOutcome) {
        if let Err(e) = timed(
            self.settings.call_timeout,
            "create_signal",
            self.store.create_signal(event),
        )
        .await
        {
            warn!(error = %e, "Failed to persist signal audit record");
            outcome.errors.push(e);
        }
    }

    async fn handle_cross(
        &mut self,
        event: &CrossEvent,
        open: &[Position],
        now: DateTime<Utc>,
        outcome: &mut TickOutcome,
    ) {
        match event.direction {
            CrossDirection::Down => {
                if !open.is_empty() {
                    debug!(open = open.len(), "Down cross with a position open, no pyramiding");
                    return;
                }
                self.try_open(OptionRight::Put, event, now, outcome).await;
            }
            CrossDirection::Up => {
                for pos in open {
                    match self
                        .close_position(pos.clone(), CloseReason::CrossReversal, event.timestamp, now)
                        .await
                    {
                        Ok(closed) => outcome.closed.push(closed),
                        Err(e) => {
                            if e.is_transient() && self.pending_writes.is_empty() {
                                warn!(symbol = pos.option_symbol, error = %e, "Reversal close failed, retrying next tick");
                                self.pending_reversal = Some(event.clone());
                            } else {
                                warn!(symbol = pos.option_symbol, error = %e, "Reversal close failed, not opening call");
                            }
                            outcome.errors.push(e);
                            return;
                        }
                    }
                }
                self.try_open(OptionRight::Call, event, now, outcome).await;
            }
        }
    }

    async fn try_open(&mut self, right: OptionRight, event: &CrossEvent, now: DateTime<Utc>, outcome: &mut TickOutcome) {
        match self.open_position(right, event, now).await {
            Ok(Some(pos)) => outcome.opened.push(pos),
            Ok(None) => {}
            Err(e) => {
                if e.is_transient() && self.pending_writes.is_empty() && self.entry_window_open(now) {
                    warn!(%right, error = %e, "Entry failed, will retry next tick");
                    self.pending_entry = Some(event.clone());
                } else if e.requires_operator() {
                    error!(critical = true, %right, error = %e, "Entry order failed, halting new entries");
                } else {
                    error!(%right, error = %e, "Entry failed");
                }
                outcome.errors.push(e);
            }
        }
    }

    fn entry_window_open(&self, now: DateTime<Utc>) -> bool {
        self.window.entry_allowed(now) && !self.window.force_close_started(now)
    }

    /// Opens a short position for `right` if policy allows. `Ok(None)` means
    /// policy declined (window closed, position exists).
    async fn open_position(
        &mut self,
        right: OptionRight,
        event: &CrossEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<Position>, EngineError> {
        if !self.entry_window_open(now) {
            info!(%right, local_time = %self.window.local_time(now), "Outside entry window, not opening");
            return Ok(None);
        }
        if let Some(reason) = &self.halted {
            return Err(EngineError::Halted(reason.clone()));
        }

        // Read-verify the single-position invariant right before acting.
        let existing = self.load_open_positions().await?;
        if !existing.is_empty() || !self.pending_writes.is_empty() {
            debug!(open = existing.len(), "Position already open, skipping entry");
            return Ok(None);
        }

        let expiry = self.window.session_date(now);
        let strike = select_strike(right, event.price);
        let contract = OptionContract::new(&self.settings.ticker, expiry, strike, right);

        let chain = timed(
            self.settings.call_timeout,
            "option_chain",
            self.market.option_chain(&self.settings.ticker, expiry),
        )
        .await?;
        let entry = chain.find(expiry, strike, right).ok_or_else(|| {
            EngineError::quote_unavailable(contract.display_name(), "contract not in chain")
        })?;
        let symbol = entry.quote.symbol.clone();
        let price = entry
            .quote
            .sell_price()
            .ok_or_else(|| EngineError::quote_unavailable(&symbol, "no bid"))?;

        let order = OrderRequest {
            account_id: self.settings.account_id.clone(),
            option_symbol: symbol.clone(),
            instruction: TradeAction::SellToOpen,
            contracts: self.settings.contracts,
            limit_price: price,
        };
        let order_id = match timed(self.settings.call_timeout, "submit_order", self.gateway.submit(&order)).await {
            Ok(id) => id,
            Err(e) => {
                if e.requires_operator() {
                    self.halted = Some(format!("opening order for {symbol} failed: {e}"));
                }
                return Err(e);
            }
        };

        let position = Position::open(&contract, symbol, self.settings.contracts, price, now)?;
        let trade = Trade::sell_to_open(&position, order_id.clone(), event.timestamp, now);
        info!(
            symbol = position.option_symbol,
            %right,
            strike = %strike,
            contracts = position.contracts,
            price = %price,
            entry_credit = %position.entry_credit,
            order_id,
            "Opened short option position"
        );

        let write = PendingWrite {
            position,
            trades: vec![trade],
            position_saved: false,
        };
        match self.persist(write).await {
            Ok(saved) => Ok(Some(saved)),
            Err((e, partial)) => {
                error!(
                    critical = true,
                    symbol = partial.position.option_symbol,
                    error = %e,
                    "Opened at broker but not persisted; trading blocked until the write succeeds"
                );
                self.pending_writes.push_back(partial);
                Err(e)
            }
        }
    }

    /// Buys the position back at the current ask and records the closing leg.
    async fn close_position(
        &mut self,
        mut pos: Position,
        reason: CloseReason,
        signal_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Position, EngineError> {
        if !pos.is_open() {
            return Err(EngineError::invalid_position(format!(
                "{} is {}",
                pos.option_symbol,
                pos.status.as_str()
            )));
        }
        if self.unconfirmed_closes.contains(&pos.option_symbol) {
            return Err(EngineError::Halted(format!(
                "close order for {} is in unknown state",
                pos.option_symbol
            )));
        }

        let quote = timed(
            self.settings.call_timeout,
            "option_quote",
            self.market.option_quote(&pos.option_symbol),
        )
        .await?;
        let exit_price = quote
            .buy_price()
            .ok_or_else(|| EngineError::quote_unavailable(&pos.option_symbol, "no ask or last"))?;

        let order = OrderRequest {
            account_id: self.settings.account_id.clone(),
            option_symbol: pos.option_symbol.clone(),
            instruction: TradeAction::BuyToClose,
            contracts: pos.contracts,
            limit_price: exit_price,
        };
        let order_id = match timed(self.settings.call_timeout, "submit_order", self.gateway.submit(&order)).await {
            Ok(id) => id,
            Err(e @ EngineError::Timeout { .. }) => {
                self.unconfirmed_closes.insert(pos.option_symbol.clone());
                self.halted = Some(format!("close order for {} timed out", pos.option_symbol));
                error!(
                    critical = true,
                    symbol = pos.option_symbol,
                    "Close order state unknown; will not resubmit"
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let realized = pos.close(exit_price, reason, now)?;
        let trade = Trade::buy_to_close(&pos, exit_price, order_id.clone(), signal_at, now);
        info!(
            symbol = pos.option_symbol,
            %reason,
            exit_price = %exit_price,
            realized_pnl = %realized,
            order_id,
            "Closed position"
        );

        // An open fill still owed for this symbol absorbs the close, so the
        // flush writes one row and both legs.
        if let Some(owed) = self
            .pending_writes
            .iter_mut()
            .find(|w| w.position.is_open() && w.position.option_symbol == pos.option_symbol)
        {
            pos.id = owed.position.id.or(pos.id);
            owed.position = pos.clone();
            owed.position_saved = false;
            owed.trades.push(trade);
            warn!(symbol = pos.option_symbol, "Close fill queued behind the owed open fill");
            return Ok(pos);
        }

        let write = PendingWrite {
            position: pos,
            trades: vec![trade],
            position_saved: false,
        };
        match self.persist(write).await {
            Ok(saved) => Ok(saved),
            Err((e, partial)) => {
                error!(
                    critical = true,
                    symbol = partial.position.option_symbol,
                    error = %e,
                    "Closed at broker but not persisted; trading blocked until the write succeeds"
                );
                self.pending_writes.push_back(partial);
                Err(e)
            }
        }
    }

    /// Writes the position row and its trade. On failure returns the write
    /// with whatever progress was made so a retry never duplicates rows.
    async fn persist(&self, mut write: PendingWrite) -> Result<Position, (EngineError, PendingWrite)> {
        let limit = self.settings.call_timeout;
        if !write.position_saved {
            let saved = match write.position.id {
                None => {
                    match timed(limit, "create_position", self.store.create_position(&write.position)).await {
                        Ok(id) => {
                            write.position.id = Some(id);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
                Some(id) => {
                    match timed(limit, "update_position", self.store.update_position(&write.position)).await {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(EngineError::persistence(format!("no row for position {id}"))),
                        Err(e) => Err(e),
                    }
                }
            };
            if let Err(e) = saved {
                return Err((e, write));
            }
            write.position_saved = true;
        }
        let position_id = write.position.id.unwrap_or_default();
        for trade in &mut write.trades {
            trade.position_id = position_id;
        }
        while !write.trades.is_empty() {
            let inserted = timed(limit, "create_trade", self.store.create_trade(&write.trades[0])).await;
            if let Err(e) = inserted {
                return Err((e, write));
            }
            write.trades.remove(0);
        }
        Ok(write.position)
    }

    async fn flush_pending_writes(&mut self) -> Result<(), EngineError> {
        while let Some(write) = self.pending_writes.pop_front() {
            match self.persist(write).await {
                Ok(pos) => info!(symbol = pos.option_symbol, "Owed write persisted"),
                Err((e, partial)) => {
                    error!(
                        critical = true,
                        symbol = partial.position.option_symbol,
                        error = %e,
                        "Owed write still failing"
                    );
                    self.pending_writes.push_front(partial);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

fn entry_right(direction: CrossDirection) -> OptionRight {
    match direction {
        CrossDirection::Down => OptionRight::Put,
        CrossDirection::Up => OptionRight::Call,
    }
}

async fn timed<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation,
            secs: limit.as_secs(),
        }),
    }
}
