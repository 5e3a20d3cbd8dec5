//! Crossover detection between SMA9 and VWAP.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use zdte_core::{CrossDirection, CrossEvent, CrossRule, IndicatorSample};

/// Stateless pass over consecutive indicator samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossDetector {
    rule: CrossRule,
}

impl CrossDetector {
    #[must_use]
    pub const fn new(rule: CrossRule) -> Self {
        Self { rule }
    }

    #[must_use]
    pub const fn rule(&self) -> CrossRule {
        self.rule
    }

    /// Emits at most one event per consecutive pair.
    #[must_use]
    pub fn detect(&self, samples: &[IndicatorSample]) -> Vec<CrossEvent> {
        match self.rule {
            CrossRule::CarriedSign => detect_carried(samples),
            CrossRule::SignProduct => detect_product(samples),
        }
    }

    /// The cross at the newest sample, if the newest sample produced one.
    #[must_use]
    pub fn latest(&self, samples: &[IndicatorSample]) -> Option<CrossEvent> {
        let last = samples.last()?;
        self.detect(samples)
            .pop()
            .filter(|event| event.timestamp == last.timestamp)
    }
}

/// Up when the spread turns positive and the last non-zero spread was not
/// positive; down symmetrically. A flat run at zero fires nothing, and a
/// touch of zero between two same-sign spreads is not a cross.
fn detect_carried(samples: &[IndicatorSample]) -> Vec<CrossEvent> {
    let mut events = Vec::new();
    let Some(first) = samples.first() else {
        return events;
    };
    let mut reference = sign(first.spread());

    for sample in &samples[1..] {
        let current = sign(sample.spread());
        let direction = match current {
            Ordering::Greater if reference != Ordering::Greater => Some(CrossDirection::Up),
            Ordering::Less if reference != Ordering::Less => Some(CrossDirection::Down),
            _ => None,
        };
        if let Some(direction) = direction {
            events.push(CrossEvent::from_sample(sample, direction));
        }
        if current != Ordering::Equal {
            reference = current;
        }
    }
    events
}

/// `prev * curr < 0`.
fn detect_product(samples: &[IndicatorSample]) -> Vec<CrossEvent> {
    samples
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (pair[0].spread(), pair[1].spread());
            if prev * curr >= Decimal::ZERO {
                return None;
            }
            let direction = if curr > Decimal::ZERO {
                CrossDirection::Up
            } else {
                CrossDirection::Down
            };
            Some(CrossEvent::from_sample(&pair[1], direction))
        })
        .collect()
}

fn sign(value: Decimal) -> Ordering {
    value.cmp(&Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn samples(spreads: &[Decimal]) -> Vec<IndicatorSample> {
        let start = Utc.with_ymd_and_hms(2025, 1, 17, 15, 0, 0).unwrap();
        spreads
            .iter()
            .enumerate()
            .map(|(i, d)| IndicatorSample {
                ticker: "QQQ".into(),
                timestamp: start + Duration::minutes(i as i64),
                price: dec!(500),
                sma9: dec!(500) + d,
                vwap: dec!(500),
            })
            .collect()
    }

    fn directions(events: &[CrossEvent]) -> Vec<(usize, CrossDirection)> {
        let start = Utc.with_ymd_and_hms(2025, 1, 17, 15, 0, 0).unwrap();
        events
            .iter()
            .map(|e| ((e.timestamp - start).num_minutes() as usize, e.direction))
            .collect()
    }

    #[test]
    fn simple_up_and_down_crosses() {
        let det = CrossDetector::default();
        let events = det.detect(&samples(&[dec!(-0.5), dec!(0.3), dec!(0.4), dec!(-0.1)]));
        assert_eq!(
            directions(&events),
            vec![(1, CrossDirection::Up), (3, CrossDirection::Down)]
        );
        assert_eq!(events[0].sma9, dec!(500.3));
        assert_eq!(events[0].vwap, dec!(500));
    }

    #[test]
    fn cross_starting_at_equality_fires() {
        let det = CrossDetector::default();
        let events = det.detect(&samples(&[dec!(0), dec!(0.2)]));
        assert_eq!(directions(&events), vec![(1, CrossDirection::Up)]);
    }

    #[test]
    fn cross_landing_on_zero_fires_when_it_continues() {
        let det = CrossDetector::default();
        let events = det.detect(&samples(&[dec!(0.4), dec!(0), dec!(-0.3)]));
        assert_eq!(directions(&events), vec![(2, CrossDirection::Down)]);
    }

    #[test]
    fn flat_zero_run_fires_nothing() {
        let det = CrossDetector::default();
        assert!(det.detect(&samples(&[dec!(0), dec!(0), dec!(0)])).is_empty());
    }

    #[test]
    fn touching_zero_without_crossing_fires_nothing() {
        let det = CrossDetector::default();
        assert!(det
            .detect(&samples(&[dec!(0.4), dec!(0), dec!(0.1)]))
            .is_empty());
    }

    #[test]
    fn sign_product_misses_crosses_through_zero() {
        let det = CrossDetector::new(CrossRule::SignProduct);
        let spreads = [dec!(0.4), dec!(0), dec!(-0.3), dec!(0.2)];
        assert_eq!(
            directions(&det.detect(&samples(&spreads))),
            vec![(3, CrossDirection::Up)]
        );
    }

    #[test]
    fn latest_only_reports_cross_on_newest_sample() {
        let det = CrossDetector::default();
        let stale = samples(&[dec!(-0.5), dec!(0.3), dec!(0.4)]);
        assert!(det.latest(&stale).is_none());

        let fresh = samples(&[dec!(-0.5), dec!(-0.2), dec!(0.4)]);
        let event = det.latest(&fresh).unwrap();
        assert_eq!(event.direction, CrossDirection::Up);
    }

    #[test]
    fn short_inputs_yield_nothing() {
        let det = CrossDetector::default();
        assert!(det.detect(&[]).is_empty());
        assert!(det.detect(&samples(&[dec!(1)])).is_empty());
        assert!(det.latest(&[]).is_none());
    }
}
