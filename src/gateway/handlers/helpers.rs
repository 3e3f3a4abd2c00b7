//! Handler helper functions
//!
//! Shared request decoding used by more than one handler.

use axum::http::HeaderMap;

use crate::ledger::Provenance;
use crate::money::Currency;

use super::super::types::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const JWT_ID_HEADER: &str = "x-jwt-id";
pub const USER_ID_HEADER: &str = "x-user-id";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Caller identity recorded on balance mutations
pub fn provenance_from_headers(headers: &HeaderMap) -> Provenance {
    Provenance {
        transaction_id: None,
        request_id: header_value(headers, REQUEST_ID_HEADER),
        jwt_id: header_value(headers, JWT_ID_HEADER),
        user_last_update: header_value(headers, USER_ID_HEADER),
    }
}

/// Requested currency, or `default` when the request names none
pub fn currency_or(code: Option<&str>, default: &Currency) -> Result<Currency, ApiError> {
    match code {
        Some(code) => Ok(Currency::new(code)?),
        None => Ok(default.clone()),
    }
}
