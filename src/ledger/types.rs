//! Ledger Core Types

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::money::Currency;

use super::state::TransferState;

/// The only transfer type accepted by the coordinator
pub const TRANSFER_TYPE: &str = "TRANSFER";

/// Correlation id shared by the two legs of one transfer.
///
/// A fresh v4 UUID per call. It ties the DEBIT and CREDIT statements together;
/// it is not a client idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TransactionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Account identity record (owned by the registry)
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Surrogate primary key
    pub id: i64,
    /// Externally assigned business key
    pub account_id: String,
    pub person_id: String,
    pub tenant_id: String,
    pub user_last_update: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for registering an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account_id: String,
    pub person_id: String,
    pub tenant_id: String,
    pub user_last_update: Option<String>,
}

/// Current running total of one account.
///
/// `amount` is signed minor units and equals Σcredit − Σdebit of the account's
/// statements when every mutation writes a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub id: i64,
    pub account_id: String,
    pub fk_account_id: i64,
    pub currency: Currency,
    pub amount: i64,
    pub tenant_id: String,
    pub transaction_id: Option<TransactionId>,
    pub request_id: Option<String>,
    pub jwt_id: Option<String>,
    pub user_last_update: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Direction of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    Credit,
    Debit,
}

impl StatementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::Credit => "CREDIT",
            StatementType::Debit => "DEBIT",
        }
    }

    /// Statement type that records a balance delta of this sign
    pub fn for_delta(delta: i64) -> Self {
        if delta < 0 {
            StatementType::Debit
        } else {
            StatementType::Credit
        }
    }

    /// Signed effect of a statement amount on the balance
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            StatementType::Credit => amount,
            StatementType::Debit => -amount,
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(StatementType::Credit),
            "DEBIT" => Ok(StatementType::Debit),
            other => Err(format!("unknown statement type: {}", other)),
        }
    }
}

/// Immutable movement record. `amount` is always positive; `kind` carries the sign.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub id: i64,
    pub fk_account_id: i64,
    pub account_id: String,
    pub person_id: String,
    pub kind: StatementType,
    pub currency: Currency,
    pub amount: i64,
    pub charged_at: DateTime<Utc>,
    pub transaction_id: Option<TransactionId>,
    pub tenant_id: String,
}

/// Input for appending a statement
#[derive(Debug, Clone)]
pub struct NewStatement {
    pub fk_account_id: i64,
    pub kind: StatementType,
    pub currency: Currency,
    pub amount: i64,
    pub tenant_id: String,
    pub transaction_id: Option<TransactionId>,
}

/// Who and what caused the last mutation of a balance row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub transaction_id: Option<TransactionId>,
    pub request_id: Option<String>,
    pub jwt_id: Option<String>,
    pub user_last_update: Option<String>,
}

impl Provenance {
    pub fn with_transaction(&self, transaction_id: TransactionId) -> Self {
        Self {
            transaction_id: Some(transaction_id),
            ..self.clone()
        }
    }
}

/// Transfer request as received from the application layer
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    /// Minor units, must be positive
    pub amount: i64,
    pub currency: Currency,
    /// Must equal [`TRANSFER_TYPE`]
    pub kind: String,
    pub provenance: Provenance,
}

impl TransferRequest {
    pub fn new(from: &str, to: &str, amount: i64, currency: Currency) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            currency,
            kind: TRANSFER_TYPE.to_string(),
            provenance: Provenance::default(),
        }
    }
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub transaction_id: TransactionId,
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub currency: Currency,
    pub status: TransferState,
    pub transfer_at: DateTime<Utc>,
    pub source_balance: i64,
    pub destination_balance: i64,
}

/// Balance plus aggregate movement view of one account
#[derive(Debug, Clone, PartialEq)]
pub struct MovementSummary {
    pub balance: Balance,
    pub credit_total: i64,
    pub debit_total: i64,
    pub net_total: i64,
    pub recent_statements: Vec<Statement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_type_sign() {
        assert_eq!(StatementType::Credit.signed(300), 300);
        assert_eq!(StatementType::Debit.signed(300), -300);
        assert_eq!(StatementType::for_delta(-1), StatementType::Debit);
        assert_eq!(StatementType::for_delta(1), StatementType::Credit);
    }

    #[test]
    fn test_statement_type_parse() {
        assert_eq!("CREDIT".parse::<StatementType>(), Ok(StatementType::Credit));
        assert_eq!("DEBIT".parse::<StatementType>(), Ok(StatementType::Debit));
        assert!("credit".parse::<StatementType>().is_err());
    }

    #[test]
    fn test_transaction_id_parse_display() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<TransactionId>().is_err());
    }

    #[test]
    fn test_transfer_request_defaults_to_transfer_type() {
        let req = TransferRequest::new("A", "B", 100, Currency::new("BRL").unwrap());
        assert_eq!(req.kind, TRANSFER_TYPE);
        assert!(req.provenance.transaction_id.is_none());
    }
}
