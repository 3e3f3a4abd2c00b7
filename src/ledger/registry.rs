//! Account Registry
//!
//! Lookup of accounts by business key or surrogate key. Registration runs on
//! the caller's transaction through `register_in`.

use std::sync::Arc;

use tracing::{Instrument, Span, debug, info, info_span};

use super::error::{LedgerError, LedgerResult};
use super::store::{LedgerTx, TransactionalStore, finish};
use super::types::{Account, NewAccount};

pub struct AccountRegistry {
    store: Arc<dyn TransactionalStore>,
    span: Span,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn TransactionalStore>, parent: &Span) -> Self {
        Self {
            store,
            span: info_span!(parent: parent, "account_registry"),
        }
    }

    /// Register inside a caller-owned transaction, so an opening balance can
    /// be created in the same commit
    pub async fn register_in(
        &self,
        tx: &mut dyn LedgerTx,
        account: &NewAccount,
    ) -> LedgerResult<Account> {
        validate(account)?;
        async {
            let created = tx
                .insert_account(account)
                .await?
                .ok_or_else(|| LedgerError::AccountExists(account.account_id.clone()))?;
            info!(
                account_id = %created.account_id,
                id = created.id,
                person_id = %created.person_id,
                "Account registered"
            );
            Ok(created)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Account by business key
    pub async fn get(&self, account_id: &str) -> LedgerResult<Account> {
        let mut tx = self.store.begin().await?;
        let result = self.resolve(tx.as_mut(), account_id).await;
        finish(tx, result).await
    }

    /// Account by surrogate key
    pub async fn get_by_id(&self, id: i64) -> LedgerResult<Account> {
        let mut tx = self.store.begin().await?;
        let result = async {
            tx.find_account_by_id(id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
        }
        .instrument(self.span.clone())
        .await;
        finish(tx, result).await
    }

    /// All accounts of one person, newest first. Empty when the person has none.
    pub async fn list_by_person(&self, person_id: &str) -> LedgerResult<Vec<Account>> {
        let mut tx = self.store.begin().await?;
        let result = tx
            .list_accounts_by_person(person_id)
            .instrument(self.span.clone())
            .await;
        finish(tx, result).await
    }

    /// Resolve a business key inside a caller-owned transaction
    pub async fn resolve(&self, tx: &mut dyn LedgerTx, account_id: &str) -> LedgerResult<Account> {
        async {
            match tx.find_account(account_id).await? {
                Some(account) => Ok(account),
                None => {
                    debug!(account_id = %account_id, "Account lookup missed");
                    Err(LedgerError::AccountNotFound(account_id.to_string()))
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

fn validate(account: &NewAccount) -> LedgerResult<()> {
    let fields = [
        ("account_id", &account.account_id),
        ("person_id", &account.person_id),
        ("tenant_id", &account.tenant_id),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(LedgerError::InvalidRequest(format!("{} is required", name)));
        }
    }
    if account.account_id.len() > 64 {
        return Err(LedgerError::InvalidRequest(
            "account_id longer than 64 characters".to_string(),
        ));
    }
    Ok(())
}
