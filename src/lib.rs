//! Fund Ledger - balances, statements and atomic transfers
//!
//! Per-account running balances on PostgreSQL with an append-only statement
//! log and two-leg transfers that commit as one database transaction.
//!
//! # Modules
//!
//! - [`money`] - Currency codes and decimal <-> minor-unit conversion
//! - [`ledger`] - Store abstraction, balance ledger, statements, transfer coordinator
//! - [`db`] - PostgreSQL pool and migrations
//! - [`gateway`] - HTTP API (axum) with OpenAPI docs
//! - [`config`] - YAML application config
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;

// Convenient re-exports at crate root
pub use ledger::{
    LedgerError, LedgerService, MemoryStore, PgStore, TransactionalStore, TransferRequest,
};
pub use money::Currency;
