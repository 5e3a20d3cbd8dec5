//! Time-of-day gates for entries and the end-of-day forced close.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use zdte_core::WindowConfig;

/// Pure predicates over a timestamp, evaluated in the exchange time zone.
#[derive(Debug, Clone)]
pub struct TradingWindowPolicy {
    config: WindowConfig,
}

impl Default for TradingWindowPolicy {
    fn default() -> Self {
        Self::new(WindowConfig::default())
    }
}

impl TradingWindowPolicy {
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.config.timezone
    }

    #[must_use]
    pub fn local_time(&self, ts: DateTime<Utc>) -> NaiveTime {
        ts.with_timezone(&self.config.timezone).time()
    }

    /// Exchange-local calendar date; also the expiry of a 0DTE contract.
    #[must_use]
    pub fn session_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.config.timezone).date_naive()
    }

    #[must_use]
    pub fn in_session(&self, ts: DateTime<Utc>) -> bool {
        let t = self.local_time(ts);
        t >= self.config.session_open && t < self.config.session_close
    }

    /// True from the session open until (excluding) the entry cutoff.
    #[must_use]
    pub fn entry_allowed(&self, ts: DateTime<Utc>) -> bool {
        let t = self.local_time(ts);
        t >= self.config.session_open && t < self.config.entry_cutoff
    }

    /// True inside the forced-close band `[force_close_start, force_close_end)`.
    #[must_use]
    pub fn force_close_due(&self, ts: DateTime<Utc>) -> bool {
        let t = self.local_time(ts);
        t >= self.config.force_close_start && t < self.config.force_close_end
    }

    /// True once the forced-close band has started, for the rest of the day.
    #[must_use]
    pub fn force_close_started(&self, ts: DateTime<Utc>) -> bool {
        self.local_time(ts) >= self.config.force_close_start
    }

    /// True once the forced-close band is over; an open position now is an incident.
    #[must_use]
    pub fn force_close_overdue(&self, ts: DateTime<Utc>) -> bool {
        self.local_time(ts) >= self.config.force_close_end
    }
}
