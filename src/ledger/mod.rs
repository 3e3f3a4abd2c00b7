//! Ledger & Fund-Transfer Engine
//!
//! Per-account running balances, an append-only statement log, and two-leg
//! transfers executed inside one store transaction.
//!
//! # Components
//!
//! - [`TransactionalStore`] / [`LedgerTx`]: scoped transactions over PostgreSQL
//!   ([`PgStore`]) or process memory ([`MemoryStore`])
//! - [`AccountRegistry`]: account lookup by business or surrogate key
//! - [`BalanceLedger`]: point reads, delta application, atomic upsert
//! - [`StatementRecorder`]: append, per-type totals, recent listing
//! - [`TransferCoordinator`]: debit + credit + statements, all or nothing
//! - [`LedgerService`]: the operations exposed to the HTTP layer

pub mod balance;
pub mod coordinator;
pub mod error;
pub mod memory;
pub mod pg;
pub mod registry;
pub mod service;
pub mod state;
pub mod statement;
pub mod store;
pub mod types;

pub use balance::BalanceLedger;
pub use coordinator::TransferCoordinator;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use memory::{Faults, MemoryStore};
pub use pg::PgStore;
pub use registry::AccountRegistry;
pub use service::LedgerService;
pub use state::TransferState;
pub use statement::StatementRecorder;
pub use store::{LedgerTx, TransactionalStore, finish};
pub use types::{
    Account, Balance, MovementSummary, NewAccount, NewStatement, Provenance, Statement,
    StatementType, TRANSFER_TYPE, TransactionId, TransferReceipt, TransferRequest,
};
