//! Ledger request/response DTOs
//!
//! Amounts cross the boundary as decimal strings in the currency's scale
//! (`"30.00"` BRL); inside they are minor units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::{Account, Balance, MovementSummary, Statement, TransferReceipt};
use crate::money::{Currency, format_amount};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    #[schema(example = "ACC-0001")]
    pub account_id: String,
    #[schema(example = "P-0001")]
    pub person_id: String,
    #[schema(example = "tenant-a")]
    pub tenant_id: String,
    /// Open a zero balance in this currency
    #[serde(default)]
    #[schema(example = "BRL")]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FundRequest {
    /// Signed decimal; negative values adjust the balance down
    #[schema(example = "100.00")]
    pub amount: String,
    /// Defaults to the configured currency
    #[serde(default)]
    #[schema(example = "BRL")]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequestData {
    #[schema(example = "ACC-0001")]
    pub from: String,
    #[schema(example = "ACC-0002")]
    pub to: String,
    #[schema(example = "30.00")]
    pub amount: String,
    #[serde(default)]
    #[schema(example = "BRL")]
    pub currency: Option<String>,
    /// Must be `TRANSFER`
    #[serde(rename = "type")]
    #[schema(example = "TRANSFER")]
    pub kind: String,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountData {
    pub id: i64,
    pub account_id: String,
    pub person_id: String,
    pub tenant_id: String,
    pub user_last_update: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountData {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            account_id: a.account_id,
            person_id: a.person_id,
            tenant_id: a.tenant_id,
            user_last_update: a.user_last_update,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceData {
    pub account_id: String,
    #[schema(example = "BRL")]
    pub currency: String,
    #[schema(example = "70.00")]
    pub amount: String,
    pub transaction_id: Option<String>,
    pub request_id: Option<String>,
    pub jwt_id: Option<String>,
    pub user_last_update: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Balance> for BalanceData {
    fn from(b: Balance) -> Self {
        Self {
            amount: format_amount(b.amount, &b.currency),
            currency: b.currency.code().to_string(),
            account_id: b.account_id,
            transaction_id: b.transaction_id.map(|t| t.to_string()),
            request_id: b.request_id,
            jwt_id: b.jwt_id,
            user_last_update: b.user_last_update,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatementData {
    pub id: i64,
    pub account_id: String,
    #[schema(example = "DEBIT")]
    pub type_charge: String,
    pub currency: String,
    #[schema(example = "30.00")]
    pub amount: String,
    pub charged_at: DateTime<Utc>,
    pub transaction_id: Option<String>,
}

impl From<Statement> for StatementData {
    fn from(s: Statement) -> Self {
        Self {
            id: s.id,
            amount: format_amount(s.amount, &s.currency),
            currency: s.currency.code().to_string(),
            account_id: s.account_id,
            type_charge: s.kind.to_string(),
            charged_at: s.charged_at,
            transaction_id: s.transaction_id.map(|t| t.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovementSummaryData {
    pub balance: BalanceData,
    pub credit_total: String,
    pub debit_total: String,
    /// credit_total - debit_total
    pub net_total: String,
    pub recent_statements: Vec<StatementData>,
}

impl From<MovementSummary> for MovementSummaryData {
    fn from(m: MovementSummary) -> Self {
        let currency: Currency = m.balance.currency.clone();
        Self {
            credit_total: format_amount(m.credit_total, &currency),
            debit_total: format_amount(m.debit_total, &currency),
            net_total: format_amount(m.net_total, &currency),
            balance: m.balance.into(),
            recent_statements: m.recent_statements.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransferData {
    pub transaction_id: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub currency: String,
    #[schema(example = "COMMITTED")]
    pub status: String,
    pub transfer_at: DateTime<Utc>,
    pub source_balance: String,
    pub destination_balance: String,
}

impl From<TransferReceipt> for TransferData {
    fn from(r: TransferReceipt) -> Self {
        Self {
            transaction_id: r.transaction_id.to_string(),
            amount: format_amount(r.amount, &r.currency),
            source_balance: format_amount(r.source_balance, &r.currency),
            destination_balance: format_amount(r.destination_balance, &r.currency),
            currency: r.currency.code().to_string(),
            from: r.from,
            to: r.to,
            status: r.status.to_string(),
            transfer_at: r.transfer_at,
        }
    }
}
