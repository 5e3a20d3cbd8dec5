//! Indicator computation and crossover detection for the 0DTE engine.

pub mod cross;
pub mod indicators;

pub use cross::CrossDetector;
pub use indicators::{normalize_series, IndicatorCalculator, SMA_PERIOD};
