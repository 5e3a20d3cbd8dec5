use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub exits: ExitConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schwab: SchwabConfig,
}

/// How a crossover is recognised when the spread touches exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossRule {
    /// Compare against the last non-zero spread; fires on crosses that start
    /// or land on equality and always alternates up/down.
    #[default]
    CarriedSign,
    /// `prev * curr < 0`; misses crosses that touch zero.
    SignProduct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub ticker: String,
    pub account_id: String,
    /// Contracts per order.
    pub contracts: i32,
    /// Minute bars pulled per tick; must cover the whole session for VWAP.
    pub lookback_bars: usize,
    pub poll_interval_secs: u64,
    /// Upper bound for any single collaborator call.
    pub call_timeout_secs: u64,
    pub cross_rule: CrossRule,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            ticker: "QQQ".to_string(),
            account_id: String::new(),
            contracts: 25,
            lookback_bars: 480,
            poll_interval_secs: 60,
            call_timeout_secs: 10,
            cross_rule: CrossRule::CarriedSign,
        }
    }
}

/// Exchange-local trading window. Times are `HH:MM:SS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub timezone: Tz,
    pub session_open: NaiveTime,
    pub session_close: NaiveTime,
    /// No new entries at or after this time.
    pub entry_cutoff: NaiveTime,
    pub force_close_start: NaiveTime,
    pub force_close_end: NaiveTime,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            session_open: hms(9, 30),
            session_close: hms(16, 0),
            entry_cutoff: hms(15, 30),
            force_close_start: hms(14, 55),
            force_close_end: hms(15, 0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Fraction of entry credit captured that triggers a take-profit (0.50 = 50%).
    pub take_profit_fraction: Decimal,
    /// Loss, as a multiple of entry credit, that triggers a stop (2.00 = -200%).
    pub stop_loss_fraction: Decimal,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            take_profit_fraction: Decimal::new(50, 2),
            stop_loss_fraction: Decimal::TWO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/zdte".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchwabConfig {
    pub api_url: String,
    /// Bearer token; supplied through `ZDTE_SCHWAB__ACCESS_TOKEN`.
    pub access_token: String,
    /// Encrypted account hash used in trader API paths.
    pub account_hash: String,
}

impl Default for SchwabConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.schwabapi.com".to_string(),
            access_token: String::new(),
            account_hash: String::new(),
        }
    }
}

impl AppConfig {
    /// Checks cross-field invariants that serde cannot express.
    ///
    /// # Errors
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        let w = &self.window;
        if w.session_open >= w.session_close {
            return Err("window.session_open must be before window.session_close".into());
        }
        if w.force_close_start >= w.force_close_end {
            return Err("window.force_close_start must be before window.force_close_end".into());
        }
        if w.force_close_end > w.session_close || w.entry_cutoff > w.session_close {
            return Err("window cutoffs must fall inside the session".into());
        }
        if self.trading.contracts <= 0 {
            return Err("trading.contracts must be positive".into());
        }
        if self.trading.lookback_bars == 0 {
            return Err("trading.lookback_bars must be positive".into());
        }
        if self.exits.take_profit_fraction <= Decimal::ZERO
            || self.exits.stop_loss_fraction <= Decimal::ZERO
        {
            return Err("exit thresholds must be positive".into());
        }
        Ok(())
    }
}

fn hms(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}
