use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use zdte_core::{CrossDirection, PriceSample};
use zdte_strategy::{CrossDetector, IndicatorCalculator};

fn start() -> DateTime<Utc> {
    // 09:30 New York
    Utc.with_ymd_and_hms(2025, 1, 17, 14, 30, 0).unwrap()
}

fn series(bars: &[(i64, u64)], gap_days_at: Option<usize>) -> Vec<PriceSample> {
    bars.iter()
        .enumerate()
        .map(|(i, (cents, volume))| {
            let mut ts = start() + Duration::minutes(i as i64);
            if matches!(gap_days_at, Some(at) if i >= at) {
                ts += Duration::days(1);
            }
            PriceSample::new("QQQ", ts, Decimal::new(*cents, 2), *volume)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn compute_is_idempotent(bars in prop::collection::vec((40_000i64..70_000, 0u64..50_000), 0..120)) {
        let calc = IndicatorCalculator::default();
        let input = series(&bars, None);
        let a = calc.compute(&input).unwrap();
        let b = calc.compute(&input).unwrap();
        prop_assert_eq!(a.len(), input.len());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn vwap_equals_price_at_session_start(
        bars in prop::collection::vec((40_000i64..70_000, 0u64..50_000), 2..120),
        split in 1usize..119,
    ) {
        let split = split.min(bars.len() - 1);
        let calc = IndicatorCalculator::default();
        let input = series(&bars, Some(split));
        let out = calc.compute(&input).unwrap();
        prop_assert_eq!(out[0].vwap, input[0].price);
        prop_assert_eq!(out[split].vwap, input[split].price);
    }

    #[test]
    fn crosses_alternate(bars in prop::collection::vec((59_000i64..61_000, 0u64..5_000), 0..200)) {
        let calc = IndicatorCalculator::default();
        let samples = calc.compute(&series(&bars, None)).unwrap();
        let events = CrossDetector::default().detect(&samples);

        for pair in events.windows(2) {
            prop_assert_ne!(pair[0].direction, pair[1].direction);
        }
        let ups = events.iter().filter(|e| e.direction == CrossDirection::Up).count();
        let downs = events.len() - ups;
        prop_assert!(ups.abs_diff(downs) <= 1);
    }
}
