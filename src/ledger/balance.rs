//! Balance Ledger
//!
//! Owns the one running total per account. Mutations take a caller-owned
//! transaction; only the point read opens its own.

use std::sync::Arc;

use tracing::{Instrument, Span, debug, info_span, warn};

use crate::money::Currency;

use super::error::{LedgerError, LedgerResult};
use super::store::{LedgerTx, TransactionalStore, finish};
use super::types::{Account, Balance, Provenance, TransactionId};

pub struct BalanceLedger {
    store: Arc<dyn TransactionalStore>,
    span: Span,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn TransactionalStore>, parent: &Span) -> Self {
        Self {
            store,
            span: info_span!(parent: parent, "balance_ledger"),
        }
    }

    /// Current balance of an account.
    ///
    /// An account that was never funded has no row and reports `BalanceNotFound`,
    /// not a zero amount.
    pub async fn get_balance(&self, account_id: &str) -> LedgerResult<Balance> {
        let mut tx = self.store.begin().await?;
        let result = self.get_balance_in(tx.as_mut(), account_id).await;
        finish(tx, result).await
    }

    pub async fn get_balance_in(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: &str,
    ) -> LedgerResult<Balance> {
        async {
            if let Some(balance) = tx.find_balance(account_id).await? {
                return Ok(balance);
            }
            match tx.find_account(account_id).await? {
                Some(_) => Err(LedgerError::BalanceNotFound(account_id.to_string())),
                None => Err(LedgerError::AccountNotFound(account_id.to_string())),
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// `amount = amount + delta` on an existing row. Returns rows affected.
    ///
    /// Zero rows means the account has no balance yet; deciding whether that is
    /// an error is up to the caller.
    pub async fn apply_delta(
        &self,
        tx: &mut dyn LedgerTx,
        fk_account_id: i64,
        delta: i64,
        provenance: &Provenance,
    ) -> LedgerResult<u64> {
        let rows = tx
            .update_balance(fk_account_id, delta, provenance)
            .instrument(self.span.clone())
            .await?;
        debug!(
            parent: &self.span,
            fk_account_id,
            delta,
            rows,
            "Balance delta applied"
        );
        Ok(rows)
    }

    /// Insert the first balance row of an account
    pub async fn create(
        &self,
        tx: &mut dyn LedgerTx,
        account: &Account,
        amount: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Balance> {
        let balance = tx
            .insert_balance(account, amount, currency, provenance)
            .instrument(self.span.clone())
            .await?;
        debug!(
            parent: &self.span,
            account_id = %account.account_id,
            currency = %currency,
            amount,
            "Balance created"
        );
        Ok(balance)
    }

    /// Add `delta` to the account's balance, creating the row on first use.
    ///
    /// One atomic statement, so concurrent first fundings of the same account
    /// end in a single row. A row held in another currency is left untouched
    /// and reported as `CurrencyMismatch`.
    pub async fn upsert(
        &self,
        tx: &mut dyn LedgerTx,
        account: &Account,
        delta: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Balance> {
        async {
            if let Some(balance) = tx
                .upsert_balance(account, delta, currency, provenance)
                .await?
            {
                return Ok(balance);
            }
            let existing = tx.lock_balance(account.id).await?.ok_or_else(|| {
                LedgerError::UpdateFailed(format!(
                    "balance of {} neither inserted nor updated",
                    account.account_id
                ))
            })?;
            warn!(
                account_id = %account.account_id,
                balance_currency = %existing.currency,
                request_currency = %currency,
                "Funding refused: currency mismatch"
            );
            Err(LedgerError::CurrencyMismatch {
                expected: existing.currency.code().to_string(),
                got: currency.code().to_string(),
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Refresh `updated_at` of a row last written by `transaction_id`.
    ///
    /// Used as the completion marker of a transfer; zero rows means the row was
    /// not written by that transaction.
    pub async fn mark_complete(
        &self,
        tx: &mut dyn LedgerTx,
        fk_account_id: i64,
        transaction_id: TransactionId,
    ) -> LedgerResult<u64> {
        tx.touch_balance(fk_account_id, transaction_id)
            .instrument(self.span.clone())
            .await
    }

    /// Row-lock the balance for the rest of the transaction
    pub async fn lock(
        &self,
        tx: &mut dyn LedgerTx,
        fk_account_id: i64,
    ) -> LedgerResult<Option<Balance>> {
        tx.lock_balance(fk_account_id)
            .instrument(self.span.clone())
            .await
    }
}
