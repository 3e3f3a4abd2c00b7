//! Transactional Store
//!
//! Scoped transaction acquisition around the relational store. A transaction
//! handle owns its connection; dropping it without `commit` rolls back and
//! returns the connection to the pool, so every exit path (error, panic,
//! cancelled future) releases it.
//!
//! Row-level operations live on [`LedgerTx`] so that every ledger mutation is
//! forced through an open transaction.

use async_trait::async_trait;
use tracing::warn;

use crate::money::Currency;

use super::error::LedgerResult;
use super::types::{
    Account, Balance, NewAccount, NewStatement, Provenance, Statement, StatementType,
    TransactionId,
};

/// Source of transactions
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Acquire a connection and start a transaction.
    ///
    /// Failure here is fatal to the calling operation; no retry at this layer.
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>>;

    /// Cheap liveness query
    async fn health_check(&self) -> LedgerResult<()>;
}

/// One open transaction
#[async_trait]
pub trait LedgerTx: Send {
    // === Accounts ===

    async fn find_account(&mut self, account_id: &str) -> LedgerResult<Option<Account>>;

    async fn find_account_by_id(&mut self, id: i64) -> LedgerResult<Option<Account>>;

    async fn list_accounts_by_person(&mut self, person_id: &str) -> LedgerResult<Vec<Account>>;

    /// Insert an account. `Ok(None)` when the business key is already taken.
    async fn insert_account(&mut self, account: &NewAccount) -> LedgerResult<Option<Account>>;

    // === Balances ===

    /// Balance row joined with its account, by business key
    async fn find_balance(&mut self, account_id: &str) -> LedgerResult<Option<Balance>>;

    /// Row-lock the balance of one account for the rest of the transaction
    async fn lock_balance(&mut self, fk_account_id: i64) -> LedgerResult<Option<Balance>>;

    /// `amount = amount + delta`; returns rows affected (0 when no row exists)
    async fn update_balance(
        &mut self,
        fk_account_id: i64,
        delta: i64,
        provenance: &Provenance,
    ) -> LedgerResult<u64>;

    /// Insert a new balance row with `amount`
    async fn insert_balance(
        &mut self,
        account: &Account,
        amount: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Balance>;

    /// Atomic insert-or-add in one statement.
    ///
    /// `Ok(None)` when a row exists with a different currency; nothing is changed then.
    async fn upsert_balance(
        &mut self,
        account: &Account,
        delta: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Option<Balance>>;

    /// Refresh `updated_at` of a row last written by `transaction_id`
    async fn touch_balance(
        &mut self,
        fk_account_id: i64,
        transaction_id: TransactionId,
    ) -> LedgerResult<u64>;

    // === Statements ===

    async fn insert_statement(&mut self, statement: &NewStatement) -> LedgerResult<Statement>;

    /// `None` when the account has no statement of `kind`
    async fn sum_statements(
        &mut self,
        account_id: &str,
        kind: StatementType,
    ) -> LedgerResult<Option<i64>>;

    /// Newest first
    async fn list_statements(&mut self, account_id: &str, limit: i64)
    -> LedgerResult<Vec<Statement>>;

    // === Completion ===

    async fn commit(self: Box<Self>) -> LedgerResult<()>;

    async fn rollback(self: Box<Self>) -> LedgerResult<()>;
}

/// Commit on `Ok`, roll back on `Err`. Exactly one of the two is issued.
///
/// A failed rollback is logged and the original error is returned; the
/// connection is discarded by the pool in that case.
pub async fn finish<T>(tx: Box<dyn LedgerTx>, result: LedgerResult<T>) -> LedgerResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, original = %e, "Rollback failed");
            }
            Err(e)
        }
    }
}
