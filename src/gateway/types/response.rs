//! Response envelope and error mapping
//!
//! Every endpoint answers `{code, msg, data}`. Handlers return [`ApiResult`];
//! the error side carries its own HTTP status and is rendered through
//! [`ApiResponse::error`], so no handler builds an error body by hand.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::{ErrorKind, LedgerError};
use crate::money::MoneyError;

/// `{code, msg, data}`; `code` is 0 on success and `data` is omitted on error
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: String::from("ok"),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            data: None,
            msg: msg.into(),
        }
    }
}

/// Handler error: HTTP status plus envelope code and message
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap `data` in a success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self { status, code, msg }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::error(self.code, self.msg))).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let kind = e.kind();
        let status =
            StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Store errors carry driver detail; log it, do not return it
        let msg = match kind {
            ErrorKind::InternalStoreError => {
                tracing::error!(error = %e, "Ledger store error");
                "internal store error".to_string()
            }
            _ => e.to_string(),
        };
        Self::new(status, error_codes::for_kind(kind), msg)
    }
}

impl From<MoneyError> for ApiError {
    fn from(e: MoneyError) -> Self {
        Self::bad_request(e.to_string())
    }
}

/// Envelope `code` values. 1xxx rejected requests, 4xxx missing resources,
/// 5xxx ledger or store failures.
pub mod error_codes {
    use crate::ledger::ErrorKind;

    pub const SUCCESS: i32 = 0;

    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INVALID_AMOUNT: i32 = 1002;
    pub const TRANSACTION_TYPE_INVALID: i32 = 1003;
    pub const CONFLICT: i32 = 1009;

    pub const NOT_FOUND: i32 = 4004;

    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const UPDATE_FAILED: i32 = 5002;
    pub const TIMEOUT: i32 = 5004;

    /// Envelope code of a ledger error kind
    pub fn for_kind(kind: ErrorKind) -> i32 {
        match kind {
            ErrorKind::InvalidRequest => INVALID_PARAMETER,
            ErrorKind::NotFound => NOT_FOUND,
            ErrorKind::UpdateFailed => UPDATE_FAILED,
            ErrorKind::TransactionTypeInvalid => TRANSACTION_TYPE_INVALID,
            ErrorKind::InvalidAmount => INVALID_AMOUNT,
            ErrorKind::Conflict => CONFLICT,
            ErrorKind::Timeout => TIMEOUT,
            ErrorKind::InternalStoreError => INTERNAL_ERROR,
        }
    }
}
