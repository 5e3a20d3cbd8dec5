//! Position lifecycle for short 0DTE options: trading windows, exit rules,
//! strike selection and the per-ticker tick engine.

pub mod engine;
pub mod exits;
pub mod service;
pub mod strikes;
pub mod window;

pub use engine::{EngineSettings, PositionLifecycleEngine, TickOutcome};
pub use exits::{pnl_fraction, ExitDecision, ExitRuleEvaluator};
pub use strikes::select_strike;
pub use window::TradingWindowPolicy;
