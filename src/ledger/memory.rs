//! In-process ledger store
//!
//! Transactions are fully serialized: `begin` takes an owned lock on the
//! tables and works on a private copy that `commit` writes back. Dropping the
//! handle discards the copy, which is the rollback. Used by tests and by the
//! binary's `--memory` mode.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::money::Currency;

use super::error::{LedgerError, LedgerResult};
use super::store::{LedgerTx, TransactionalStore};
use super::types::{
    Account, Balance, NewAccount, NewStatement, Provenance, Statement, StatementType,
    TransactionId,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: Vec<Account>,
    balances: Vec<Balance>,
    statements: Vec<Statement>,
    next_account_id: i64,
    next_balance_id: i64,
    next_statement_id: i64,
}

impl Tables {
    fn account_by_key(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.account_id == account_id)
    }

    fn account_by_id(&self, id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn balance_mut(&mut self, fk_account_id: i64) -> Option<&mut Balance> {
        self.balances
            .iter_mut()
            .find(|b| b.fk_account_id == fk_account_id)
    }
}

/// Failures to inject into subsequent transactions
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_begin: bool,
    /// Fail balance updates of this surrogate account key
    pub fail_update_for: Option<i64>,
    /// Fail statement inserts of this type
    pub fail_statement_kind: Option<StatementType>,
    pub fail_commit: bool,
    /// Sleep before every row operation
    pub latency: Option<Duration>,
}

/// In-process [`TransactionalStore`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock().unwrap_or_else(|p| p.into_inner()) = faults;
    }

    pub fn clear_faults(&self) {
        self.set_faults(Faults::default());
    }

    fn current_faults(&self) -> Faults {
        self.faults
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Committed balance rows
    pub async fn balances(&self) -> Vec<Balance> {
        self.tables.lock().await.balances.clone()
    }

    /// Committed statement rows in insertion order
    pub async fn statements(&self) -> Vec<Statement> {
        self.tables.lock().await.statements.clone()
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let faults = self.current_faults();
        if faults.fail_begin {
            return Err(LedgerError::Store("connection refused".to_string()));
        }
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            work,
            faults,
        }))
    }

    async fn health_check(&self) -> LedgerResult<()> {
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
    faults: Faults,
}

impl MemoryTx {
    async fn pause(&self) {
        if let Some(latency) = self.faults.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn statement_row(&mut self, statement: &NewStatement) -> LedgerResult<Statement> {
        let account = self
            .work
            .account_by_id(statement.fk_account_id)
            .cloned()
            .ok_or_else(|| {
                LedgerError::Store(format!(
                    "foreign key violation: account {} does not exist",
                    statement.fk_account_id
                ))
            })?;
        self.work.next_statement_id += 1;
        Ok(Statement {
            id: self.work.next_statement_id,
            fk_account_id: account.id,
            account_id: account.account_id,
            person_id: account.person_id,
            kind: statement.kind,
            currency: statement.currency.clone(),
            amount: statement.amount,
            charged_at: Utc::now(),
            transaction_id: statement.transaction_id,
            tenant_id: statement.tenant_id.clone(),
        })
    }

    fn new_balance(
        &mut self,
        account: &Account,
        amount: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> Balance {
        self.work.next_balance_id += 1;
        Balance {
            id: self.work.next_balance_id,
            account_id: account.account_id.clone(),
            fk_account_id: account.id,
            currency: currency.clone(),
            amount,
            tenant_id: account.tenant_id.clone(),
            transaction_id: provenance.transaction_id,
            request_id: provenance.request_id.clone(),
            jwt_id: provenance.jwt_id.clone(),
            user_last_update: provenance.user_last_update.clone(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

fn add_delta(balance: &mut Balance, delta: i64, provenance: &Provenance) -> LedgerResult<()> {
    balance.amount = balance
        .amount
        .checked_add(delta)
        .ok_or_else(|| LedgerError::Store("bigint out of range".to_string()))?;
    balance.transaction_id = provenance.transaction_id;
    balance.request_id = provenance.request_id.clone();
    balance.jwt_id = provenance.jwt_id.clone();
    balance.user_last_update = provenance.user_last_update.clone();
    balance.updated_at = Some(Utc::now());
    Ok(())
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn find_account(&mut self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.pause().await;
        Ok(self.work.account_by_key(account_id).cloned())
    }

    async fn find_account_by_id(&mut self, id: i64) -> LedgerResult<Option<Account>> {
        self.pause().await;
        Ok(self.work.account_by_id(id).cloned())
    }

    async fn list_accounts_by_person(&mut self, person_id: &str) -> LedgerResult<Vec<Account>> {
        self.pause().await;
        let mut accounts: Vec<Account> = self
            .work
            .accounts
            .iter()
            .filter(|a| a.person_id == person_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(accounts)
    }

    async fn insert_account(&mut self, account: &NewAccount) -> LedgerResult<Option<Account>> {
        self.pause().await;
        if self.work.account_by_key(&account.account_id).is_some() {
            return Ok(None);
        }
        self.work.next_account_id += 1;
        let row = Account {
            id: self.work.next_account_id,
            account_id: account.account_id.clone(),
            person_id: account.person_id.clone(),
            tenant_id: account.tenant_id.clone(),
            user_last_update: account.user_last_update.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.work.accounts.push(row.clone());
        Ok(Some(row))
    }

    async fn find_balance(&mut self, account_id: &str) -> LedgerResult<Option<Balance>> {
        self.pause().await;
        Ok(self
            .work
            .balances
            .iter()
            .find(|b| b.account_id == account_id)
            .cloned())
    }

    async fn lock_balance(&mut self, fk_account_id: i64) -> LedgerResult<Option<Balance>> {
        // Transactions are serialized, the row is ours already
        self.pause().await;
        Ok(self.work.balance_mut(fk_account_id).map(|b| b.clone()))
    }

    async fn update_balance(
        &mut self,
        fk_account_id: i64,
        delta: i64,
        provenance: &Provenance,
    ) -> LedgerResult<u64> {
        self.pause().await;
        if self.faults.fail_update_for == Some(fk_account_id) {
            return Err(LedgerError::Store(format!(
                "injected update failure for account {}",
                fk_account_id
            )));
        }
        match self.work.balance_mut(fk_account_id) {
            Some(balance) => {
                add_delta(balance, delta, provenance)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_balance(
        &mut self,
        account: &Account,
        amount: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Balance> {
        self.pause().await;
        if self.work.balance_mut(account.id).is_some() {
            return Err(LedgerError::Store(format!(
                "duplicate key value violates unique constraint on fk_account_id={}",
                account.id
            )));
        }
        let row = self.new_balance(account, amount, currency, provenance);
        self.work.balances.push(row.clone());
        Ok(row)
    }

    async fn upsert_balance(
        &mut self,
        account: &Account,
        delta: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Option<Balance>> {
        self.pause().await;
        if self.faults.fail_update_for == Some(account.id) {
            return Err(LedgerError::Store(format!(
                "injected update failure for account {}",
                account.id
            )));
        }
        if let Some(balance) = self.work.balance_mut(account.id) {
            if &balance.currency != currency {
                return Ok(None);
            }
            add_delta(balance, delta, provenance)?;
            return Ok(Some(balance.clone()));
        }
        let row = self.new_balance(account, delta, currency, provenance);
        self.work.balances.push(row.clone());
        Ok(Some(row))
    }

    async fn touch_balance(
        &mut self,
        fk_account_id: i64,
        transaction_id: TransactionId,
    ) -> LedgerResult<u64> {
        self.pause().await;
        match self.work.balance_mut(fk_account_id) {
            Some(balance) if balance.transaction_id == Some(transaction_id) => {
                balance.updated_at = Some(Utc::now());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn insert_statement(&mut self, statement: &NewStatement) -> LedgerResult<Statement> {
        self.pause().await;
        if self.faults.fail_statement_kind == Some(statement.kind) {
            return Err(LedgerError::Store(format!(
                "injected {} statement failure",
                statement.kind
            )));
        }
        let row = self.statement_row(statement)?;
        self.work.statements.push(row.clone());
        Ok(row)
    }

    async fn sum_statements(
        &mut self,
        account_id: &str,
        kind: StatementType,
    ) -> LedgerResult<Option<i64>> {
        self.pause().await;
        let mut total: Option<i64> = None;
        for s in self
            .work
            .statements
            .iter()
            .filter(|s| s.account_id == account_id && s.kind == kind)
        {
            let sum = total.unwrap_or(0).checked_add(s.amount).ok_or_else(|| {
                LedgerError::Store("bigint out of range".to_string())
            })?;
            total = Some(sum);
        }
        Ok(total)
    }

    async fn list_statements(
        &mut self,
        account_id: &str,
        limit: i64,
    ) -> LedgerResult<Vec<Statement>> {
        self.pause().await;
        let mut rows: Vec<Statement> = self
            .work
            .statements
            .iter()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.charged_at.cmp(&a.charged_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        if self.faults.fail_commit {
            return Err(LedgerError::Store("injected commit failure".to_string()));
        }
        let MemoryTx {
            mut guard, work, ..
        } = *self;
        *guard = work;
        debug!("memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> LedgerResult<()> {
        debug!("memory transaction rolled back");
        Ok(())
    }
}
