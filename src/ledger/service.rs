//! Ledger Service
//!
//! Application-facing façade. Wires the components over one store and bounds
//! every operation with the configured timeout; a timed-out operation drops
//! its transaction, which rolls it back.

use std::future::Future;
use std::sync::Arc;

use tracing::{Instrument, Span, info, info_span, warn};

use crate::config::LedgerConfig;
use crate::money::{Currency, MoneyError};

use super::balance::BalanceLedger;
use super::coordinator::TransferCoordinator;
use super::error::{LedgerError, LedgerResult};
use super::registry::AccountRegistry;
use super::statement::StatementRecorder;
use super::store::{LedgerTx, TransactionalStore, finish};
use super::types::{
    Account, Balance, MovementSummary, NewAccount, NewStatement, Provenance, StatementType,
    TransactionId, TransferReceipt, TransferRequest,
};

pub struct LedgerService {
    store: Arc<dyn TransactionalStore>,
    registry: Arc<AccountRegistry>,
    balances: Arc<BalanceLedger>,
    statements: Arc<StatementRecorder>,
    coordinator: TransferCoordinator,
    config: LedgerConfig,
    default_currency: Currency,
    span: Span,
}

impl LedgerService {
    /// Fails only when the configured default currency is not a valid code
    pub fn new(
        store: Arc<dyn TransactionalStore>,
        config: LedgerConfig,
        parent: &Span,
    ) -> Result<Self, MoneyError> {
        let default_currency = Currency::new(&config.default_currency)?;
        let span = info_span!(parent: parent, "ledger", store = store.name());
        let registry = Arc::new(AccountRegistry::new(store.clone(), &span));
        let balances = Arc::new(BalanceLedger::new(store.clone(), &span));
        let statements = Arc::new(StatementRecorder::new(store.clone(), &span));
        let coordinator = TransferCoordinator::new(
            store.clone(),
            registry.clone(),
            balances.clone(),
            statements.clone(),
            &span,
        );

        Ok(Self {
            store,
            registry,
            balances,
            statements,
            coordinator,
            config,
            default_currency,
            span,
        })
    }

    pub fn default_currency(&self) -> &Currency {
        &self.default_currency
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> LedgerResult<T>
    where
        F: Future<Output = LedgerResult<T>>,
    {
        match tokio::time::timeout(self.config.op_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    parent: &self.span,
                    operation,
                    timeout_ms = self.config.op_timeout_ms,
                    "Ledger operation timed out"
                );
                Err(LedgerError::Timeout)
            }
        }
    }

    // === Accounts ===

    /// Register an account. With `opening_currency` a zero balance is created
    /// in the same transaction; without it the account stays unfunded.
    pub async fn create_account(
        &self,
        account: NewAccount,
        opening_currency: Option<Currency>,
    ) -> LedgerResult<Account> {
        self.bounded("create_account", async {
            let mut tx = self.store.begin().await?;
            let result = self
                .create_account_in(tx.as_mut(), &account, opening_currency.as_ref())
                .await;
            finish(tx, result).await
        })
        .await
    }

    async fn create_account_in(
        &self,
        tx: &mut dyn LedgerTx,
        account: &NewAccount,
        opening_currency: Option<&Currency>,
    ) -> LedgerResult<Account> {
        let created = self.registry.register_in(tx, account).await?;
        if let Some(currency) = opening_currency {
            let provenance = Provenance {
                user_last_update: account.user_last_update.clone(),
                ..Default::default()
            };
            self.balances
                .create(tx, &created, 0, currency, &provenance)
                .await?;
        }
        Ok(created)
    }

    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Account> {
        self.bounded("get_account", self.registry.get(account_id))
            .await
    }

    pub async fn get_account_by_id(&self, id: i64) -> LedgerResult<Account> {
        self.bounded("get_account_by_id", self.registry.get_by_id(id))
            .await
    }

    pub async fn list_accounts_by_person(&self, person_id: &str) -> LedgerResult<Vec<Account>> {
        self.bounded(
            "list_accounts_by_person",
            self.registry.list_by_person(person_id),
        )
        .await
    }

    // === Balances ===

    pub async fn get_balance(&self, account_id: &str) -> LedgerResult<Balance> {
        self.bounded("get_balance", self.balances.get_balance(account_id))
            .await
    }

    /// Add `delta` minor units to an account's balance, creating it on first use.
    ///
    /// `currency` defaults to the configured one. Unless disabled in config, a
    /// CREDIT (positive delta) or DEBIT (negative delta) statement is written in
    /// the same transaction under a fresh transaction id.
    pub async fn add_fund_balance(
        &self,
        account_id: &str,
        delta: i64,
        currency: Option<Currency>,
        provenance: Provenance,
    ) -> LedgerResult<Balance> {
        let amount = match delta.checked_abs() {
            Some(0) => {
                return Err(LedgerError::InvalidAmount(
                    "funding delta must not be zero".to_string(),
                ));
            }
            Some(amount) => amount,
            None => {
                return Err(LedgerError::InvalidAmount(format!(
                    "funding delta out of range: {}",
                    delta
                )));
            }
        };
        let currency = currency.unwrap_or_else(|| self.default_currency.clone());

        self.bounded("add_fund_balance", async {
            let mut tx = self.store.begin().await?;
            let result = self
                .fund_in(tx.as_mut(), account_id, delta, amount, &currency, &provenance)
                .await;
            finish(tx, result).await
        })
        .await
    }

    async fn fund_in(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: &str,
        delta: i64,
        amount: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Balance> {
        let account = self.registry.resolve(tx, account_id).await?;
        let transaction_id = TransactionId::new();
        let provenance = provenance.with_transaction(transaction_id);

        let balance = self
            .balances
            .upsert(tx, &account, delta, currency, &provenance)
            .await?;

        if self.config.fund_writes_statement {
            self.statements
                .append(
                    tx,
                    &NewStatement {
                        fk_account_id: account.id,
                        kind: StatementType::for_delta(delta),
                        currency: currency.clone(),
                        amount,
                        tenant_id: account.tenant_id.clone(),
                        transaction_id: Some(transaction_id),
                    },
                )
                .await?;
        }

        info!(
            parent: &self.span,
            account_id = %account.account_id,
            delta,
            currency = %currency,
            balance = balance.amount,
            transaction_id = %transaction_id,
            "Balance funded"
        );
        Ok(balance)
    }

    // === Movements ===

    /// Balance, credit/debit totals and the most recent statements, read in
    /// one transaction. An account without statements of a kind totals zero
    /// here; an account without a balance is not found.
    pub async fn get_movement_summary(&self, account_id: &str) -> LedgerResult<MovementSummary> {
        self.bounded("get_movement_summary", async {
            let mut tx = self.store.begin().await?;
            let result = self.summary_in(tx.as_mut(), account_id).await;
            finish(tx, result).await
        })
        .await
    }

    async fn summary_in(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: &str,
    ) -> LedgerResult<MovementSummary> {
        let balance = self.balances.get_balance_in(tx, account_id).await?;
        let credit_total = self.total_or_zero(tx, account_id, StatementType::Credit).await?;
        let debit_total = self.total_or_zero(tx, account_id, StatementType::Debit).await?;
        let recent_statements = self
            .statements
            .list_recent_in(tx, account_id, self.config.recent_statements_limit)
            .await?;

        Ok(MovementSummary {
            balance,
            credit_total,
            debit_total,
            net_total: credit_total.saturating_sub(debit_total),
            recent_statements,
        })
    }

    async fn total_or_zero(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: &str,
        kind: StatementType,
    ) -> LedgerResult<i64> {
        match self.statements.sum_by_type_in(tx, account_id, kind).await {
            Err(LedgerError::StatementsNotFound { .. }) => Ok(0),
            other => other,
        }
    }

    // === Transfers ===

    pub async fn transfer_funds(&self, req: TransferRequest) -> LedgerResult<TransferReceipt> {
        self.bounded("transfer_funds", self.coordinator.transfer(req))
            .await
    }

    pub async fn health_check(&self) -> LedgerResult<()> {
        self.bounded(
            "health_check",
            self.store.health_check().instrument(self.span.clone()),
        )
        .await
    }
}
