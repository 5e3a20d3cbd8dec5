//! SMA9 and session-reset VWAP over a minute-bar series.
//!
//! Both indicators accumulate at full `Decimal` precision and are rounded
//! to cents once, when the sample is emitted.

use std::collections::VecDeque;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use zdte_core::{EngineError, IndicatorSample, PriceSample};

/// Default SMA window.
pub const SMA_PERIOD: usize = 9;

const OUTPUT_DP: u32 = 2;

/// Computes `sma9` and `vwap` aligned 1:1 with the input series.
///
/// The SMA window shrinks at the start of the series (minimum one sample)
/// instead of producing undefined values. VWAP restarts whenever the
/// exchange-local calendar date changes.
#[derive(Debug, Clone)]
pub struct IndicatorCalculator {
    sma_period: usize,
    timezone: Tz,
}

impl Default for IndicatorCalculator {
    fn default() -> Self {
        Self::new(SMA_PERIOD, chrono_tz::America::New_York)
    }
}

impl IndicatorCalculator {
    #[must_use]
    pub fn new(sma_period: usize, timezone: Tz) -> Self {
        Self {
            sma_period: sma_period.max(1),
            timezone,
        }
    }

    /// Pure, restartable computation over an ordered series.
    ///
    /// An empty series yields an empty result.
    ///
    /// # Errors
    /// Returns `InvalidInput` if timestamps are not strictly increasing, the
    /// series mixes tickers, or a price is not positive.
    pub fn compute(&self, series: &[PriceSample]) -> Result<Vec<IndicatorSample>, EngineError> {
        validate(series)?;

        let mut out = Vec::with_capacity(series.len());
        let mut window: VecDeque<Decimal> = VecDeque::with_capacity(self.sma_period);
        let mut window_sum = Decimal::ZERO;
        let mut session: Option<NaiveDate> = None;
        let mut cum_pv = Decimal::ZERO;
        let mut cum_volume = Decimal::ZERO;

        for sample in series {
            window.push_back(sample.price);
            window_sum += sample.price;
            if window.len() > self.sma_period {
                if let Some(old) = window.pop_front() {
                    window_sum -= old;
                }
            }
            let sma = window_sum / Decimal::from(window.len());

            let day = self.session_date(sample);
            if session != Some(day) {
                session = Some(day);
                cum_pv = Decimal::ZERO;
                cum_volume = Decimal::ZERO;
            }
            let volume = Decimal::from(sample.volume);
            cum_pv += sample.price * volume;
            cum_volume += volume;
            let vwap = if cum_volume.is_zero() {
                sample.price
            } else {
                cum_pv / cum_volume
            };

            out.push(IndicatorSample {
                ticker: sample.ticker.clone(),
                timestamp: sample.timestamp,
                price: sample.price,
                sma9: sma.round_dp(OUTPUT_DP),
                vwap: vwap.round_dp(OUTPUT_DP),
            });
        }

        Ok(out)
    }

    /// Exchange-local trading date of a sample.
    #[must_use]
    pub fn session_date(&self, sample: &PriceSample) -> NaiveDate {
        sample.timestamp.with_timezone(&self.timezone).date_naive()
    }
}

/// Orders a raw feed by timestamp and keeps only the latest-seen sample for
/// each duplicated timestamp.
#[must_use]
pub fn normalize_series(mut samples: Vec<PriceSample>) -> Vec<PriceSample> {
    // Stable sort keeps arrival order among equal timestamps.
    samples.sort_by_key(|s| s.timestamp);
    let mut out: Vec<PriceSample> = Vec::with_capacity(samples.len());
    for sample in samples {
        match out.last_mut() {
            Some(last) if last.timestamp == sample.timestamp => *last = sample,
            _ => out.push(sample),
        }
    }
    out
}

fn validate(series: &[PriceSample]) -> Result<(), EngineError> {
    let Some(first) = series.first() else {
        return Ok(());
    };
    for sample in series {
        if sample.ticker != first.ticker {
            return Err(EngineError::invalid_input(format!(
                "series mixes tickers {} and {}",
                first.ticker, sample.ticker
            )));
        }
        if sample.price <= Decimal::ZERO {
            return Err(EngineError::invalid_input(format!(
                "non-positive price {} at {}",
                sample.price, sample.timestamp
            )));
        }
    }
    if let Some(pair) = series
        .windows(2)
        .find(|pair| pair[1].timestamp <= pair[0].timestamp)
    {
        return Err(EngineError::invalid_input(format!(
            "timestamps not strictly increasing at {}",
            pair[1].timestamp
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    // 2025-01-17 09:30 New York == 14:30 UTC
    fn open_bell() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 17, 14, 30, 0).unwrap()
    }

    fn bars(prices: &[Decimal], volume: u64) -> Vec<PriceSample> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceSample::new("QQQ", open_bell() + Duration::minutes(i as i64), *p, volume))
            .collect()
    }

    #[test]
    fn empty_series_is_not_an_error() {
        let calc = IndicatorCalculator::default();
        assert!(calc.compute(&[]).unwrap().is_empty());
    }

    #[test]
    fn sma_window_shrinks_at_series_start() {
        let calc = IndicatorCalculator::default();
        let out = calc.compute(&bars(&[dec!(10), dec!(20), dec!(30)], 100)).unwrap();
        assert_eq!(out[0].sma9, dec!(10));
        assert_eq!(out[1].sma9, dec!(15));
        assert_eq!(out[2].sma9, dec!(20));
    }

    #[test]
    fn sma_uses_at_most_nine_samples() {
        let calc = IndicatorCalculator::default();
        let prices: Vec<Decimal> = (1..=10).map(Decimal::from).collect();
        let out = calc.compute(&bars(&prices, 1)).unwrap();
        // mean of 2..=10
        assert_eq!(out[9].sma9, dec!(6));
    }

    #[test]
    fn vwap_weights_by_volume() {
        let calc = IndicatorCalculator::default();
        let mut series = bars(&[dec!(100), dec!(110)], 0);
        series[0].volume = 300;
        series[1].volume = 100;
        let out = calc.compute(&series).unwrap();
        assert_eq!(out[0].vwap, dec!(100));
        assert_eq!(out[1].vwap, dec!(102.50));
    }

    #[test]
    fn zero_volume_falls_back_to_price() {
        let calc = IndicatorCalculator::default();
        let out = calc.compute(&bars(&[dec!(50.25), dec!(51)], 0)).unwrap();
        assert_eq!(out[0].vwap, dec!(50.25));
        assert_eq!(out[1].vwap, dec!(51));
    }

    #[test]
    fn vwap_resets_on_new_local_session() {
        let calc = IndicatorCalculator::default();
        let day1 = PriceSample::new("QQQ", open_bell(), dec!(500), 1_000);
        // 15:59 NY on the same day, still session 1
        let late = PriceSample::new("QQQ", open_bell() + Duration::minutes(389), dec!(510), 1_000);
        // next morning
        let day2 = PriceSample::new("QQQ", open_bell() + Duration::days(1), dec!(520), 10);
        let out = calc.compute(&[day1, late, day2]).unwrap();
        assert_eq!(out[1].vwap, dec!(505));
        assert_eq!(out[2].vwap, dec!(520));
        // SMA does not reset
        assert_eq!(out[2].sma9, dec!(510));
    }

    #[test]
    fn session_boundary_uses_exchange_time_not_utc() {
        let calc = IndicatorCalculator::default();
        // 23:30 and 00:30 UTC straddle UTC midnight but are both the same NY evening
        let a = PriceSample::new("QQQ", Utc.with_ymd_and_hms(2025, 1, 17, 23, 30, 0).unwrap(), dec!(10), 1);
        let b = PriceSample::new("QQQ", Utc.with_ymd_and_hms(2025, 1, 18, 0, 30, 0).unwrap(), dec!(20), 1);
        let out = calc.compute(&[a, b]).unwrap();
        assert_eq!(out[1].vwap, dec!(15));
    }

    #[test]
    fn outputs_rounded_to_cents_once() {
        let calc = IndicatorCalculator::default();
        let out = calc
            .compute(&bars(&[dec!(10.001), dec!(10.002), dec!(10.004)], 1))
            .unwrap();
        // mean 10.00233.. -> 10.00 (accumulated unrounded)
        assert_eq!(out[2].sma9, dec!(10.00));
        assert_eq!(out[2].vwap, dec!(10.00));
    }

    #[test]
    fn unordered_series_is_rejected() {
        let calc = IndicatorCalculator::default();
        let mut series = bars(&[dec!(1), dec!(2)], 1);
        series.swap(0, 1);
        assert!(matches!(calc.compute(&series), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn mixed_tickers_are_rejected() {
        let calc = IndicatorCalculator::default();
        let mut series = bars(&[dec!(1), dec!(2)], 1);
        series[1].ticker = "SPY".into();
        assert!(calc.compute(&series).is_err());
    }

    #[test]
    fn normalize_keeps_latest_duplicate() {
        let ts = open_bell();
        let raw = vec![
            PriceSample::new("QQQ", ts + Duration::minutes(1), dec!(2), 1),
            PriceSample::new("QQQ", ts, dec!(1), 1),
            PriceSample::new("QQQ", ts + Duration::minutes(1), dec!(3), 5),
        ];
        let clean = normalize_series(raw);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].price, dec!(1));
        assert_eq!(clean[1].price, dec!(3));
        assert_eq!(clean[1].volume, 5);
    }
}
