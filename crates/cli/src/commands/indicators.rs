//! Indicator diagnostics command.
//!
//! Prints the SMA9/VWAP table for a bar file and the crossovers the engine
//! would act on.

use std::collections::HashMap;

use anyhow::Result;
use clap::{Args, ValueEnum};
use zdte_core::{CrossRule, IndicatorSample};
use zdte_data::CsvStorage;
use zdte_strategy::{normalize_series, CrossDetector, IndicatorCalculator, SMA_PERIOD};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum RuleArg {
    CarriedSign,
    SignProduct,
}

impl From<RuleArg> for CrossRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::CarriedSign => Self::CarriedSign,
            RuleArg::SignProduct => Self::SignProduct,
        }
    }
}

/// Arguments for the indicators command.
#[derive(Args, Debug, Clone)]
pub struct IndicatorsArgs {
    /// Minute bars CSV (timestamp,ticker,price|close,volume)
    #[arg(long)]
    pub bars: String,

    /// Config file path (timezone and default cross rule)
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Override the configured cross rule
    #[arg(long, value_enum)]
    pub rule: Option<RuleArg>,

    /// Only print rows where a cross fired
    #[arg(long)]
    pub crosses_only: bool,
}

/// Runs the indicators command.
///
/// # Errors
/// Returns an error if the configuration or bar file cannot be read, or the
/// series is invalid.
pub fn run_indicators(args: IndicatorsArgs) -> Result<()> {
    let config = super::load_config(&args.config, None)?;
    let rule = args.rule.map_or(config.trading.cross_rule, CrossRule::from);
    let tz = config.window.timezone;

    let series = normalize_series(CsvStorage::read_bars(&args.bars)?);
    let samples = IndicatorCalculator::new(SMA_PERIOD, tz).compute(&series)?;
    let crosses: HashMap<_, _> = CrossDetector::new(rule)
        .detect(&samples)
        .into_iter()
        .map(|c| (c.timestamp, c.direction))
        .collect();

    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>9} {:<5}",
        "Time", "Price", "SMA9", "VWAP", "Spread", "Cross"
    );
    println!("{}", "-".repeat(69));
    for sample in &samples {
        let cross = crosses.get(&sample.timestamp);
        if args.crosses_only && cross.is_none() {
            continue;
        }
        print_row(sample, cross.map_or("", |d| d.as_str()), tz);
    }

    println!(
        "\n{} samples, {} crosses ({:?})",
        samples.len(),
        crosses.len(),
        rule
    );
    Ok(())
}

fn print_row(sample: &IndicatorSample, cross: &str, tz: chrono_tz::Tz) {
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>9} {:<5}",
        sample.timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
        sample.price.round_dp(2),
        sample.sma9.round_dp(4),
        sample.vwap.round_dp(4),
        sample.spread().round_dp(4),
        cross
    );
}
