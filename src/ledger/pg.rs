//! PostgreSQL Ledger Store
//!
//! Row operations run as runtime-checked queries on one `sqlx::Transaction`.
//! Balance and statement rows are joined with `account` so callers always see
//! the business key next to the surrogate key.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::money::Currency;

use super::error::{LedgerError, LedgerResult};
use super::store::{LedgerTx, TransactionalStore};
use super::types::{
    Account, Balance, NewAccount, NewStatement, Provenance, Statement, StatementType,
    TransactionId,
};

const ACCOUNT_COLUMNS: &str =
    "id, account_id, person_id, tenant_id, user_last_update, created_at, updated_at";

const BALANCE_COLUMNS: &str = "b.id, a.account_id, b.fk_account_id, b.currency, b.amount, \
     b.tenant_id, b.transaction_id, b.request_id, b.jwt_id, b.user_last_update, \
     b.created_at, b.updated_at";

const STATEMENT_COLUMNS: &str = "s.id, s.fk_account_id, a.account_id, a.person_id, \
     s.type_charge, s.currency, s.amount, s.charged_at, s.transaction_id, s.tenant_id";

/// [`TransactionalStore`] over a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionalStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn health_check(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One open PostgreSQL transaction. Dropped without commit, sqlx rolls it back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

fn parse_currency(code: String) -> LedgerResult<Currency> {
    Currency::new(code.trim())
        .map_err(|e| LedgerError::Store(format!("invalid currency in row: {}", e)))
}

fn row_to_account(row: &PgRow) -> LedgerResult<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        person_id: row.try_get("person_id")?,
        tenant_id: row.try_get("tenant_id")?,
        user_last_update: row.try_get("user_last_update")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_balance(row: &PgRow, account_id: String) -> LedgerResult<Balance> {
    let transaction_id: Option<Uuid> = row.try_get("transaction_id")?;
    Ok(Balance {
        id: row.try_get("id")?,
        account_id,
        fk_account_id: row.try_get("fk_account_id")?,
        currency: parse_currency(row.try_get("currency")?)?,
        amount: row.try_get("amount")?,
        tenant_id: row.try_get("tenant_id")?,
        transaction_id: transaction_id.map(TransactionId::from),
        request_id: row.try_get("request_id")?,
        jwt_id: row.try_get("jwt_id")?,
        user_last_update: row.try_get("user_last_update")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_joined_balance(row: &PgRow) -> LedgerResult<Balance> {
    let account_id: String = row.try_get("account_id")?;
    row_to_balance(row, account_id)
}

fn row_to_statement(row: &PgRow) -> LedgerResult<Statement> {
    let kind: String = row.try_get("type_charge")?;
    let kind = kind
        .parse::<StatementType>()
        .map_err(LedgerError::Store)?;
    let transaction_id: Option<Uuid> = row.try_get("transaction_id")?;
    Ok(Statement {
        id: row.try_get("id")?,
        fk_account_id: row.try_get("fk_account_id")?,
        account_id: row.try_get("account_id")?,
        person_id: row.try_get("person_id")?,
        kind,
        currency: parse_currency(row.try_get("currency")?)?,
        amount: row.try_get("amount")?,
        charged_at: row.try_get("charged_at")?,
        transaction_id: transaction_id.map(TransactionId::from),
        tenant_id: row.try_get("tenant_id")?,
    })
}

fn tx_uuid(provenance: &Provenance) -> Option<Uuid> {
    provenance.transaction_id.map(|t| t.as_uuid())
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_account(&mut self, account_id: &str) -> LedgerResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM account WHERE account_id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_account_by_id(&mut self, id: i64) -> LedgerResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM account WHERE id = $1", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn list_accounts_by_person(&mut self, person_id: &str) -> LedgerResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account WHERE person_id = $1 ORDER BY id DESC",
            ACCOUNT_COLUMNS
        ))
        .bind(person_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_account).collect()
    }

    async fn insert_account(&mut self, account: &NewAccount) -> LedgerResult<Option<Account>> {
        // DO NOTHING keeps the transaction usable when the key is taken
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO account (account_id, person_id, tenant_id, user_last_update, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (account_id) DO NOTHING
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(&account.account_id)
        .bind(&account.person_id)
        .bind(&account.tenant_id)
        .bind(&account.user_last_update)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_balance(&mut self, account_id: &str) -> LedgerResult<Option<Balance>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM account_balance b
            JOIN account a ON a.id = b.fk_account_id
            WHERE a.account_id = $1
            "#,
            BALANCE_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_joined_balance).transpose()
    }

    async fn lock_balance(&mut self, fk_account_id: i64) -> LedgerResult<Option<Balance>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM account_balance b
            JOIN account a ON a.id = b.fk_account_id
            WHERE b.fk_account_id = $1
            FOR UPDATE OF b
            "#,
            BALANCE_COLUMNS
        ))
        .bind(fk_account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_joined_balance).transpose()
    }

    async fn update_balance(
        &mut self,
        fk_account_id: i64,
        delta: i64,
        provenance: &Provenance,
    ) -> LedgerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE account_balance
            SET amount = amount + $1,
                transaction_id = $2,
                request_id = $3,
                jwt_id = $4,
                user_last_update = $5,
                updated_at = NOW()
            WHERE fk_account_id = $6
            "#,
        )
        .bind(delta)
        .bind(tx_uuid(provenance))
        .bind(&provenance.request_id)
        .bind(&provenance.jwt_id)
        .bind(&provenance.user_last_update)
        .bind(fk_account_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_balance(
        &mut self,
        account: &Account,
        amount: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Balance> {
        let row = sqlx::query(
            r#"
            INSERT INTO account_balance
                (fk_account_id, currency, amount, tenant_id, transaction_id,
                 request_id, jwt_id, user_last_update, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(currency.code())
        .bind(amount)
        .bind(&account.tenant_id)
        .bind(tx_uuid(provenance))
        .bind(&provenance.request_id)
        .bind(&provenance.jwt_id)
        .bind(&provenance.user_last_update)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_balance(&row, account.account_id.clone())
    }

    async fn upsert_balance(
        &mut self,
        account: &Account,
        delta: i64,
        currency: &Currency,
        provenance: &Provenance,
    ) -> LedgerResult<Option<Balance>> {
        // The WHERE on the conflict arm skips rows of another currency; no row comes back then
        let row = sqlx::query(
            r#"
            INSERT INTO account_balance
                (fk_account_id, currency, amount, tenant_id, transaction_id,
                 request_id, jwt_id, user_last_update, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (fk_account_id) DO UPDATE
            SET amount = account_balance.amount + EXCLUDED.amount,
                transaction_id = EXCLUDED.transaction_id,
                request_id = EXCLUDED.request_id,
                jwt_id = EXCLUDED.jwt_id,
                user_last_update = EXCLUDED.user_last_update,
                updated_at = NOW()
            WHERE account_balance.currency = EXCLUDED.currency
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(currency.code())
        .bind(delta)
        .bind(&account.tenant_id)
        .bind(tx_uuid(provenance))
        .bind(&provenance.request_id)
        .bind(&provenance.jwt_id)
        .bind(&provenance.user_last_update)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|r| row_to_balance(&r, account.account_id.clone()))
            .transpose()
    }

    async fn touch_balance(
        &mut self,
        fk_account_id: i64,
        transaction_id: TransactionId,
    ) -> LedgerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE account_balance
            SET updated_at = NOW()
            WHERE fk_account_id = $1 AND transaction_id = $2
            "#,
        )
        .bind(fk_account_id)
        .bind(transaction_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_statement(&mut self, statement: &NewStatement) -> LedgerResult<Statement> {
        let row = sqlx::query(&format!(
            r#"
            WITH s AS (
                INSERT INTO account_statement
                    (fk_account_id, type_charge, currency, amount, charged_at,
                     transaction_id, tenant_id)
                VALUES ($1, $2, $3, $4, NOW(), $5, $6)
                RETURNING *
            )
            SELECT {}
            FROM s
            JOIN account a ON a.id = s.fk_account_id
            "#,
            STATEMENT_COLUMNS
        ))
        .bind(statement.fk_account_id)
        .bind(statement.kind.as_str())
        .bind(statement.currency.code())
        .bind(statement.amount)
        .bind(statement.transaction_id.map(|t| t.as_uuid()))
        .bind(&statement.tenant_id)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_statement(&row)
    }

    async fn sum_statements(
        &mut self,
        account_id: &str,
        kind: StatementType,
    ) -> LedgerResult<Option<i64>> {
        let total = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT SUM(s.amount)::BIGINT
            FROM account_statement s
            JOIN account a ON a.id = s.fk_account_id
            WHERE a.account_id = $1 AND s.type_charge = $2
            "#,
        )
        .bind(account_id)
        .bind(kind.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn list_statements(
        &mut self,
        account_id: &str,
        limit: i64,
    ) -> LedgerResult<Vec<Statement>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM account_statement s
            JOIN account a ON a.id = s.fk_account_id
            WHERE a.account_id = $1
            ORDER BY s.charged_at DESC, s.id DESC
            LIMIT $2
            "#,
            STATEMENT_COLUMNS
        ))
        .bind(account_id)
        .bind(limit.max(0))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_statement).collect()
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> LedgerResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
