//! CLI commands for the 0DTE engine.

pub mod indicators;
pub mod positions;
pub mod replay;
pub mod run;

pub use indicators::{run_indicators, IndicatorsArgs};
pub use positions::{run_positions, PositionsArgs};
pub use replay::{run_replay, ReplayArgs};
pub use run::{run_engine, RunArgs};

use anyhow::{Context, Result};
use zdte_core::{AppConfig, ConfigLoader};

/// Loads `path`, layering `Config.<profile>.toml` on top when a profile is given.
pub(crate) fn load_config(path: &str, profile: Option<&str>) -> Result<AppConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile),
        None => ConfigLoader::load(path),
    }
    .with_context(|| format!("Failed to load configuration from {path}"))
}
