//! Ledger Error Types
//!
//! `LedgerError` carries the detail; `ErrorKind` is the closed classification
//! the boundary maps to transport status codes.

use thiserror::Error;

use super::types::StatementType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Balance not found for account {0}")]
    BalanceNotFound(String),

    #[error("No {kind} statements for account {account_id}")]
    StatementsNotFound {
        account_id: String,
        kind: StatementType,
    },

    #[error("Update unsuccessful: {0}")]
    UpdateFailed(String),

    #[error("Transaction type invalid: {0}")]
    TransactionTypeInvalid(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Currency mismatch: balance is {expected}, request is {got}")]
    CurrencyMismatch { expected: String, got: String },

    #[error("Source and destination account are the same")]
    SameAccount,

    #[error("Account already exists: {0}")]
    AccountExists(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Timeout: operation deadline exceeded")]
    Timeout,

    #[error("Store error: {0}")]
    Store(String),
}

/// Closed error classification, evaluated once at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    UpdateFailed,
    TransactionTypeInvalid,
    InvalidAmount,
    Conflict,
    Timeout,
    InternalStoreError,
}

impl ErrorKind {
    /// Stable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::UpdateFailed => "UPDATE_FAILED",
            ErrorKind::TransactionTypeInvalid => "TRANSACTION_TYPE_INVALID",
            ErrorKind::InvalidAmount => "INVALID_AMOUNT",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::InternalStoreError => "INTERNAL_STORE_ERROR",
        }
    }

    /// HTTP status for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::TransactionTypeInvalid | ErrorKind::InvalidAmount | ErrorKind::Conflict => {
                409
            }
            ErrorKind::Timeout => 504,
            ErrorKind::UpdateFailed | ErrorKind::InternalStoreError => 500,
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AccountNotFound(_)
            | LedgerError::BalanceNotFound(_)
            | LedgerError::StatementsNotFound { .. } => ErrorKind::NotFound,
            LedgerError::UpdateFailed(_) => ErrorKind::UpdateFailed,
            LedgerError::TransactionTypeInvalid(_) => ErrorKind::TransactionTypeInvalid,
            LedgerError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            LedgerError::CurrencyMismatch { .. }
            | LedgerError::SameAccount
            | LedgerError::AccountExists(_) => ErrorKind::Conflict,
            LedgerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            LedgerError::Timeout => ErrorKind::Timeout,
            LedgerError::Store(_) => ErrorKind::InternalStoreError,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => LedgerError::Timeout,
            other => LedgerError::Store(other.to_string()),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            LedgerError::AccountNotFound("A".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::StatementsNotFound {
                account_id: "A".into(),
                kind: StatementType::Debit
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(LedgerError::SameAccount.kind(), ErrorKind::Conflict);
        assert_eq!(
            LedgerError::Store("boom".into()).kind(),
            ErrorKind::InternalStoreError
        );
    }

    #[test]
    fn test_http_status_table() {
        assert_eq!(ErrorKind::InvalidRequest.http_status(), 400);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::TransactionTypeInvalid.http_status(), 409);
        assert_eq!(ErrorKind::InvalidAmount.http_status(), 409);
        assert_eq!(ErrorKind::Conflict.http_status(), 409);
        assert_eq!(ErrorKind::Timeout.http_status(), 504);
        assert_eq!(ErrorKind::UpdateFailed.http_status(), 500);
        assert_eq!(ErrorKind::InternalStoreError.http_status(), 500);
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        assert_eq!(
            LedgerError::from(sqlx::Error::PoolTimedOut),
            LedgerError::Timeout
        );
        assert_eq!(
            LedgerError::from(sqlx::Error::RowNotFound).kind(),
            ErrorKind::InternalStoreError
        );
    }

    #[test]
    fn test_display() {
        let err = LedgerError::CurrencyMismatch {
            expected: "BRL".into(),
            got: "USD".into(),
        };
        assert_eq!(
            err.to_string(),
            "Currency mismatch: balance is BRL, request is USD"
        );
    }
}
