//! Statement Recorder
//!
//! Append-only movement log. Rows are never updated or deleted.

use std::sync::Arc;

use tracing::{Instrument, Span, debug, info_span};

use super::error::{LedgerError, LedgerResult};
use super::store::{LedgerTx, TransactionalStore, finish};
use super::types::{NewStatement, Statement, StatementType};

pub struct StatementRecorder {
    store: Arc<dyn TransactionalStore>,
    span: Span,
}

impl StatementRecorder {
    pub fn new(store: Arc<dyn TransactionalStore>, parent: &Span) -> Self {
        Self {
            store,
            span: info_span!(parent: parent, "statement_recorder"),
        }
    }

    /// Append one statement inside a caller-owned transaction
    pub async fn append(
        &self,
        tx: &mut dyn LedgerTx,
        statement: &NewStatement,
    ) -> LedgerResult<Statement> {
        if statement.amount <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "statement amount must be positive, got {}",
                statement.amount
            )));
        }
        let row = tx
            .insert_statement(statement)
            .instrument(self.span.clone())
            .await?;
        debug!(
            parent: &self.span,
            account_id = %row.account_id,
            kind = %row.kind,
            amount = row.amount,
            transaction_id = ?row.transaction_id,
            "Statement appended"
        );
        Ok(row)
    }

    /// Total of all statements of `kind`.
    ///
    /// No statement of that kind is `StatementsNotFound`, not zero.
    pub async fn sum_by_type(&self, account_id: &str, kind: StatementType) -> LedgerResult<i64> {
        let mut tx = self.store.begin().await?;
        let result = self.sum_by_type_in(tx.as_mut(), account_id, kind).await;
        finish(tx, result).await
    }

    pub async fn sum_by_type_in(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: &str,
        kind: StatementType,
    ) -> LedgerResult<i64> {
        tx.sum_statements(account_id, kind)
            .instrument(self.span.clone())
            .await?
            .ok_or_else(|| LedgerError::StatementsNotFound {
                account_id: account_id.to_string(),
                kind,
            })
    }

    /// Newest `limit` statements of an account
    pub async fn list_recent(&self, account_id: &str, limit: i64) -> LedgerResult<Vec<Statement>> {
        let mut tx = self.store.begin().await?;
        let result = self.list_recent_in(tx.as_mut(), account_id, limit).await;
        finish(tx, result).await
    }

    pub async fn list_recent_in(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: &str,
        limit: i64,
    ) -> LedgerResult<Vec<Statement>> {
        tx.list_statements(account_id, limit)
            .instrument(self.span.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryStore;
    use crate::ledger::types::{Account, NewAccount, TransactionId};
    use crate::money::Currency;

    async fn setup() -> (Arc<MemoryStore>, StatementRecorder, Account) {
        let store = Arc::new(MemoryStore::new());
        let recorder = StatementRecorder::new(store.clone(), &Span::none());
        let mut tx = store.begin().await.unwrap();
        let account = tx
            .insert_account(&NewAccount {
                account_id: "ACC-1".into(),
                person_id: "P-1".into(),
                tenant_id: "T-1".into(),
                user_last_update: None,
            })
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();
        (store, recorder, account)
    }

    fn statement(account: &Account, kind: StatementType, amount: i64) -> NewStatement {
        NewStatement {
            fk_account_id: account.id,
            kind,
            currency: Currency::new("BRL").unwrap(),
            amount,
            tenant_id: account.tenant_id.clone(),
            transaction_id: Some(TransactionId::new()),
        }
    }

    #[tokio::test]
    async fn test_sum_absent_is_not_found() {
        let (_store, recorder, _account) = setup().await;
        let err = recorder
            .sum_by_type("ACC-1", StatementType::Debit)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_sum_by_type() {
        let (store, recorder, account) = setup().await;
        let mut tx = store.begin().await.unwrap();
        recorder
            .append(tx.as_mut(), &statement(&account, StatementType::Credit, 1_000))
            .await
            .unwrap();
        recorder
            .append(tx.as_mut(), &statement(&account, StatementType::Credit, 500))
            .await
            .unwrap();
        recorder
            .append(tx.as_mut(), &statement(&account, StatementType::Debit, 300))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            recorder
                .sum_by_type("ACC-1", StatementType::Credit)
                .await
                .unwrap(),
            1_500
        );
        assert_eq!(
            recorder
                .sum_by_type("ACC-1", StatementType::Debit)
                .await
                .unwrap(),
            300
        );
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let (store, recorder, account) = setup().await;
        let mut tx = store.begin().await.unwrap();
        for amount in 1..=12 {
            recorder
                .append(tx.as_mut(), &statement(&account, StatementType::Credit, amount))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let recent = recorder.list_recent("ACC-1", 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].amount, 12);
        assert_eq!(recent[9].amount, 3);
    }

    #[tokio::test]
    async fn test_append_rejects_non_positive() {
        let (store, recorder, account) = setup().await;
        let mut tx = store.begin().await.unwrap();
        let err = recorder
            .append(tx.as_mut(), &statement(&account, StatementType::Debit, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }
}
