//! Persistence for the 0DTE engine.
//!
//! This crate provides:
//! - Postgres client with the engine schema migrations
//! - Row models and repositories for positions, trades and signals
//! - `Store` implementations backed by Postgres or process memory
//! - CSV loaders for minute bars and option quotes

pub mod csv_storage;
pub mod database;
pub mod memory;
pub mod models;
pub mod pg_store;
pub mod repositories;

pub use csv_storage::{CsvStorage, QuoteSnapshot};
pub use database::DatabaseClient;
pub use memory::InMemoryStore;
pub use models::{PositionRecord, SignalRecord, TradeRecord};
pub use pg_store::PgStore;
pub use repositories::{PositionRepository, Repositories, SignalRepository, TradeRepository};
