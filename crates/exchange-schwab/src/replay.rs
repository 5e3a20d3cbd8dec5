//! `MarketData` over recorded bars and option quotes.
//!
//! The replay clock decides what is visible: bars and quotes stamped after
//! the clock do not exist yet.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use zdte_core::{ChainEntry, EngineError, MarketData, OptionChain, OptionQuote, PriceSample};
use zdte_data::QuoteSnapshot;

#[derive(Debug)]
pub struct ReplayMarket {
    bars: Vec<PriceSample>,
    quotes: Vec<QuoteSnapshot>,
    clock: Mutex<DateTime<Utc>>,
}

impl ReplayMarket {
    /// Bars and quotes are sorted by timestamp; the clock starts at the
    /// first bar.
    #[must_use]
    pub fn new(mut bars: Vec<PriceSample>, mut quotes: Vec<QuoteSnapshot>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        quotes.sort_by_key(|q| q.timestamp);
        let start = bars.first().map_or(DateTime::<Utc>::MIN_UTC, |b| b.timestamp);
        Self {
            bars,
            quotes,
            clock: Mutex::new(start),
        }
    }

    pub fn set_clock(&self, now: DateTime<Utc>) {
        *self.clock.lock() = now;
    }

    #[must_use]
    pub fn clock(&self) -> DateTime<Utc> {
        *self.clock.lock()
    }

    /// Distinct bar timestamps, ascending. Replay ticks once per entry.
    #[must_use]
    pub fn bar_times(&self) -> Vec<DateTime<Utc>> {
        let mut times: Vec<_> = self.bars.iter().map(|b| b.timestamp).collect();
        times.dedup();
        times
    }

    fn visible_bars(&self, ticker: &str) -> Vec<PriceSample> {
        let now = self.clock();
        self.bars
            .iter()
            .filter(|b| b.ticker == ticker && b.timestamp <= now)
            .cloned()
            .collect()
    }

    /// Latest visible snapshot per option symbol.
    fn latest_quotes(&self) -> HashMap<&str, &QuoteSnapshot> {
        let now = self.clock();
        let mut latest = HashMap::new();
        for snap in self.quotes.iter().take_while(|q| q.timestamp <= now) {
            latest.insert(snap.quote.symbol.as_str(), snap);
        }
        latest
    }
}

#[async_trait]
impl MarketData for ReplayMarket {
    async fn latest_bar(&self, ticker: &str) -> Result<PriceSample, EngineError> {
        self.visible_bars(ticker)
            .pop()
            .ok_or_else(|| EngineError::MarketData(format!("no bars for {ticker} yet")))
    }

    async fn recent_bars(&self, ticker: &str, lookback: usize) -> Result<Vec<PriceSample>, EngineError> {
        let mut bars = self.visible_bars(ticker);
        let start = bars.len().saturating_sub(lookback);
        Ok(bars.split_off(start))
    }

    async fn option_chain(&self, ticker: &str, expiry: NaiveDate) -> Result<OptionChain, EngineError> {
        let mut entries: Vec<ChainEntry> = self
            .latest_quotes()
            .into_values()
            .filter(|s| s.contract.underlying == ticker && s.contract.expiry == expiry)
            .map(|s| ChainEntry {
                contract: s.contract.clone(),
                quote: s.quote.clone(),
            })
            .collect();
        if entries.is_empty() {
            return Err(EngineError::quote_unavailable(
                ticker,
                format!("no recorded quotes expiring {expiry}"),
            ));
        }
        entries.sort_by(|a, b| a.contract.strike.cmp(&b.contract.strike));

        let underlying_price = self
            .visible_bars(ticker)
            .last()
            .map_or(Decimal::ZERO, |b| b.price);
        Ok(OptionChain {
            underlying: ticker.to_string(),
            underlying_price,
            entries,
        })
    }

    async fn option_quote(&self, option_symbol: &str) -> Result<OptionQuote, EngineError> {
        self.latest_quotes()
            .get(option_symbol)
            .map(|s| s.quote.clone())
            .ok_or_else(|| EngineError::quote_unavailable(option_symbol, "no recorded quote yet"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use zdte_core::{OptionContract, OptionRight};

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 17, 14, 30, 0).unwrap() + Duration::minutes(minute)
    }

    fn snapshot(minute: i64, strike: Decimal, bid: Decimal) -> QuoteSnapshot {
        let contract = OptionContract::new(
            "QQQ",
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            strike,
            OptionRight::Put,
        );
        QuoteSnapshot {
            timestamp: t(minute),
            quote: OptionQuote {
                symbol: contract.symbol().unwrap(),
                bid,
                ask: bid + dec!(0.05),
                last: bid,
            },
            contract,
        }
    }

    fn market() -> ReplayMarket {
        let bars = (0..5)
            .map(|m| PriceSample::new("QQQ", t(m), dec!(600) - Decimal::from(m), 1000))
            .collect();
        let quotes = vec![
            snapshot(0, dec!(597), dec!(1.00)),
            snapshot(3, dec!(597), dec!(1.40)),
            snapshot(1, dec!(596), dec!(0.80)),
        ];
        ReplayMarket::new(bars, quotes)
    }

    #[tokio::test]
    async fn test_clock_hides_future_bars() {
        let market = market();
        market.set_clock(t(2));

        let bars = market.recent_bars("QQQ", 10).await.unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(market.latest_bar("QQQ").await.unwrap().price, dec!(598));
        assert_eq!(market.recent_bars("QQQ", 2).await.unwrap()[0].price, dec!(599));
    }

    #[tokio::test]
    async fn test_quotes_follow_the_clock() {
        let market = market();
        let symbol = "QQQ   250117P00597000";

        market.set_clock(t(2));
        assert_eq!(market.option_quote(symbol).await.unwrap().bid, dec!(1.00));

        market.set_clock(t(4));
        assert_eq!(market.option_quote(symbol).await.unwrap().bid, dec!(1.40));

        let chain = market
            .option_chain("QQQ", NaiveDate::from_ymd_opt(2025, 1, 17).unwrap())
            .await
            .unwrap();
        assert_eq!(chain.entries.len(), 2);
        assert_eq!(chain.underlying_price, dec!(596));
    }

    #[tokio::test]
    async fn test_quote_before_first_snapshot_is_unavailable() {
        let market = market();
        market.set_clock(t(0));
        let err = market.option_quote("QQQ   250117P00596000").await.unwrap_err();
        assert!(matches!(err, EngineError::QuoteUnavailable { .. }));
    }
}
