//! Transfer Coordinator
//!
//! Runs a two-leg transfer (debit source, credit destination, one statement per
//! leg) inside a single store transaction. Either every write commits or none
//! is visible.
//!
//! Both balance rows are locked in ascending surrogate key order before the
//! debit, so opposite-direction transfers between the same pair cannot
//! deadlock each other.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use super::balance::BalanceLedger;
use super::error::{LedgerError, LedgerResult};
use super::registry::AccountRegistry;
use super::state::TransferState;
use super::statement::StatementRecorder;
use super::store::{LedgerTx, TransactionalStore, finish};
use super::types::{
    Account, Balance, NewStatement, StatementType, TRANSFER_TYPE, TransactionId,
    TransferReceipt, TransferRequest,
};

pub struct TransferCoordinator {
    store: Arc<dyn TransactionalStore>,
    registry: Arc<AccountRegistry>,
    balances: Arc<BalanceLedger>,
    statements: Arc<StatementRecorder>,
    span: Span,
}

/// Balances after both legs were applied
struct LegOutcome {
    source_balance: i64,
    destination_balance: i64,
}

impl TransferCoordinator {
    pub fn new(
        store: Arc<dyn TransactionalStore>,
        registry: Arc<AccountRegistry>,
        balances: Arc<BalanceLedger>,
        statements: Arc<StatementRecorder>,
        parent: &Span,
    ) -> Self {
        Self {
            store,
            registry,
            balances,
            statements,
            span: info_span!(parent: parent, "transfer_coordinator"),
        }
    }

    /// Execute a transfer to completion.
    ///
    /// Request validation happens before any transaction is opened; a rejected
    /// request touches nothing.
    pub async fn transfer(&self, req: TransferRequest) -> LedgerResult<TransferReceipt> {
        validate(&req)?;

        let mut tx = self.store.begin().await?;
        let transaction_id = TransactionId::new();
        let span = info_span!(
            parent: &self.span,
            "transfer",
            transaction_id = %transaction_id,
            from = %req.from,
            to = %req.to,
        );

        async move {
            let mut state = TransferState::Validated;
            let result = self
                .run_legs(tx.as_mut(), &req, transaction_id, &mut state)
                .await;
            if let Err(e) = &result {
                warn!(state = %state, error = %e, "Transfer failed, rolling back");
            }

            let outcome = match finish(tx, result).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    advance(&mut state, TransferState::RolledBack);
                    debug!(state = %state, "Transfer aborted");
                    return Err(e);
                }
            };
            advance(&mut state, TransferState::Committed);

            info!(
                amount = req.amount,
                currency = %req.currency,
                "Transfer committed"
            );

            Ok(TransferReceipt {
                transaction_id,
                from: req.from,
                to: req.to,
                amount: req.amount,
                currency: req.currency,
                status: state,
                transfer_at: Utc::now(),
                source_balance: outcome.source_balance,
                destination_balance: outcome.destination_balance,
            })
        }
        .instrument(span)
        .await
    }

    async fn run_legs(
        &self,
        tx: &mut dyn LedgerTx,
        req: &TransferRequest,
        transaction_id: TransactionId,
        state: &mut TransferState,
    ) -> LedgerResult<LegOutcome> {
        let source = self.registry.resolve(tx, &req.from).await?;
        let destination = self.registry.resolve(tx, &req.to).await?;

        let (source_before, destination_before) = self.lock_pair(tx, &source, &destination).await?;
        for balance in [&source_before, &destination_before] {
            if balance.currency != req.currency {
                return Err(LedgerError::CurrencyMismatch {
                    expected: balance.currency.code().to_string(),
                    got: req.currency.code().to_string(),
                });
            }
        }

        let provenance = req.provenance.with_transaction(transaction_id);

        // Debit leg
        let rows = self
            .balances
            .apply_delta(tx, source.id, -req.amount, &provenance)
            .await?;
        if rows == 0 {
            return Err(LedgerError::UpdateFailed(format!(
                "debit of {} affected no rows",
                source.account_id
            )));
        }
        advance(state, TransferState::DebitApplied);

        self.statements
            .append(tx, &leg_statement(&source, StatementType::Debit, req, transaction_id))
            .await?;
        advance(state, TransferState::DebitStatementWritten);

        // Credit leg
        let rows = self
            .balances
            .apply_delta(tx, destination.id, req.amount, &provenance)
            .await?;
        if rows == 0 {
            return Err(LedgerError::UpdateFailed(format!(
                "credit of {} affected no rows",
                destination.account_id
            )));
        }
        advance(state, TransferState::CreditApplied);

        self.statements
            .append(
                tx,
                &leg_statement(&destination, StatementType::Credit, req, transaction_id),
            )
            .await?;
        advance(state, TransferState::CreditStatementWritten);

        // Completion marker on the source row
        let rows = self
            .balances
            .mark_complete(tx, source.id, transaction_id)
            .await?;
        if rows == 0 {
            return Err(LedgerError::UpdateFailed(format!(
                "completion marker of {} affected no rows",
                source.account_id
            )));
        }

        Ok(LegOutcome {
            source_balance: source_before.amount.saturating_sub(req.amount),
            destination_balance: destination_before.amount.saturating_add(req.amount),
        })
    }

    /// Lock source and destination balances, lower surrogate key first.
    ///
    /// A transfer never creates a balance: a missing row is `UpdateFailed`.
    async fn lock_pair(
        &self,
        tx: &mut dyn LedgerTx,
        source: &Account,
        destination: &Account,
    ) -> LedgerResult<(Balance, Balance)> {
        let source_first = source.id < destination.id;
        let (first, second) = if source_first {
            (source, destination)
        } else {
            (destination, source)
        };

        let first_balance = self.balances.lock(tx, first.id).await?;
        let second_balance = self.balances.lock(tx, second.id).await?;
        let (source_balance, destination_balance) = if source_first {
            (first_balance, second_balance)
        } else {
            (second_balance, first_balance)
        };

        let missing = |account: &Account| {
            LedgerError::UpdateFailed(format!("account {} has no balance", account.account_id))
        };
        Ok((
            source_balance.ok_or_else(|| missing(source))?,
            destination_balance.ok_or_else(|| missing(destination))?,
        ))
    }
}

fn validate(req: &TransferRequest) -> LedgerResult<()> {
    if req.kind != TRANSFER_TYPE {
        return Err(LedgerError::TransactionTypeInvalid(req.kind.clone()));
    }
    if req.amount <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "transfer amount must be positive, got {}",
            req.amount
        )));
    }
    if req.from == req.to {
        return Err(LedgerError::SameAccount);
    }
    Ok(())
}

fn advance(state: &mut TransferState, to: TransferState) {
    debug_assert!(
        state.can_transition(to),
        "illegal transfer transition {} -> {}",
        state,
        to
    );
    *state = to;
}

fn leg_statement(
    account: &Account,
    kind: StatementType,
    req: &TransferRequest,
    transaction_id: TransactionId,
) -> NewStatement {
    NewStatement {
        fk_account_id: account.id,
        kind,
        currency: req.currency.clone(),
        amount: req.amount,
        tenant_id: account.tenant_id.clone(),
        transaction_id: Some(transaction_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::{Faults, MemoryStore};
    use crate::ledger::types::{NewAccount, Provenance};
    use crate::money::Currency;

    struct Fixture {
        store: Arc<MemoryStore>,
        coordinator: TransferCoordinator,
        a: Account,
        b: Account,
    }

    fn brl() -> Currency {
        Currency::new("BRL").unwrap()
    }

    async fn fixture(a_amount: Option<i64>, b_amount: Option<i64>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn TransactionalStore> = store.clone();
        let span = Span::none();
        let registry = Arc::new(AccountRegistry::new(dyn_store.clone(), &span));
        let balances = Arc::new(BalanceLedger::new(dyn_store.clone(), &span));
        let statements = Arc::new(StatementRecorder::new(dyn_store.clone(), &span));

        let mut tx = store.begin().await.unwrap();
        let mut accounts = Vec::new();
        for (key, amount) in [("A", a_amount), ("B", b_amount)] {
            let acc = tx
                .insert_account(&NewAccount {
                    account_id: key.into(),
                    person_id: "P-1".into(),
                    tenant_id: "T-1".into(),
                    user_last_update: None,
                })
                .await
                .unwrap()
                .unwrap();
            if let Some(amount) = amount {
                tx.insert_balance(&acc, amount, &brl(), &Provenance::default())
                    .await
                    .unwrap();
            }
            accounts.push(acc);
        }
        tx.commit().await.unwrap();

        let b = accounts.pop().unwrap();
        let a = accounts.pop().unwrap();
        Fixture {
            store,
            coordinator: TransferCoordinator::new(dyn_store, registry, balances, statements, &span),
            a,
            b,
        }
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_pairs_statements() {
        let f = fixture(Some(10_000), Some(5_000)).await;
        let receipt = f
            .coordinator
            .transfer(TransferRequest::new("A", "B", 3_000, brl()))
            .await
            .unwrap();

        assert_eq!(receipt.status, TransferState::Committed);
        assert_eq!(receipt.source_balance, 7_000);
        assert_eq!(receipt.destination_balance, 8_000);

        let statements = f.store.statements().await;
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].fk_account_id, f.a.id);
        assert_eq!(statements[0].kind, StatementType::Debit);
        assert_eq!(statements[1].fk_account_id, f.b.id);
        assert_eq!(statements[1].kind, StatementType::Credit);
        for s in &statements {
            assert_eq!(s.amount, 3_000);
            assert_eq!(s.transaction_id, Some(receipt.transaction_id));
        }
    }

    #[tokio::test]
    async fn test_reverse_direction_uses_same_lock_order() {
        let f = fixture(Some(1_000), Some(1_000)).await;
        let receipt = f
            .coordinator
            .transfer(TransferRequest::new("B", "A", 400, brl()))
            .await
            .unwrap();
        assert_eq!(receipt.source_balance, 600);
        assert_eq!(receipt.destination_balance, 1_400);
    }

    #[tokio::test]
    async fn test_missing_destination_balance_is_update_failed() {
        let f = fixture(Some(1_000), None).await;
        let err = f
            .coordinator
            .transfer(TransferRequest::new("A", "B", 100, brl()))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UpdateFailed(_)));
        assert!(f.store.statements().await.is_empty());
        assert_eq!(f.store.balances().await[0].amount, 1_000);
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let f = fixture(Some(1_000), Some(0)).await;
        let err = f
            .coordinator
            .transfer(TransferRequest::new("A", "ZZZ", 100, brl()))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound("ZZZ".into()));
    }

    #[tokio::test]
    async fn test_credit_statement_failure_rolls_back_debit() {
        let f = fixture(Some(1_000), Some(0)).await;
        f.store.set_faults(Faults {
            fail_statement_kind: Some(StatementType::Credit),
            ..Default::default()
        });

        let before = f.store.balances().await;
        let err = f
            .coordinator
            .transfer(TransferRequest::new("A", "B", 100, brl()))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(_)));
        assert_eq!(f.store.balances().await, before);
        assert!(f.store.statements().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejections_before_transaction() {
        let f = fixture(Some(1_000), Some(0)).await;
        // A store that cannot begin proves nothing was opened
        f.store.set_faults(Faults {
            fail_begin: true,
            ..Default::default()
        });

        let mut req = TransferRequest::new("A", "B", 100, brl());
        req.kind = "PAYMENT".into();
        assert_eq!(
            f.coordinator.transfer(req).await.unwrap_err(),
            LedgerError::TransactionTypeInvalid("PAYMENT".into())
        );

        let err = f
            .coordinator
            .transfer(TransferRequest::new("A", "B", 0, brl()))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = f
            .coordinator
            .transfer(TransferRequest::new("A", "A", 10, brl()))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::SameAccount);
    }

    #[tokio::test]
    async fn test_currency_mismatch() {
        let f = fixture(Some(1_000), Some(0)).await;
        let err = f
            .coordinator
            .transfer(TransferRequest::new("A", "B", 10, Currency::new("USD").unwrap()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::CurrencyMismatch {
                expected: "BRL".into(),
                got: "USD".into()
            }
        );
    }
}
