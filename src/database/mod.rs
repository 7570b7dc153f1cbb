//! # Database Module
//!
//! PostgreSQL persistence for trade state using tokio-postgres and deadpool.
//! Includes connection management, models, migrations and the trade record store.

pub mod connection;
pub mod models;
pub mod migrations;
pub mod trade_store;

pub use connection::DatabaseConnection;
pub use trade_store::{InMemoryTradeStore, PostgresTradeStore, TradeRecordStore};
