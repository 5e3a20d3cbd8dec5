//! Row models for the engine tables.
//!
//! Models derive `sqlx::FromRow` and convert to and from the `zdte-core`
//! domain types.

pub mod position;
pub mod signal;
pub mod trade;

pub use position::PositionRecord;
pub use signal::SignalRecord;
pub use trade::TradeRecord;
