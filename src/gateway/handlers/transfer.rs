//! Transfer handler

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap};

use crate::ledger::TransferRequest;
use crate::money::parse_amount;

use super::super::state::AppState;
use super::super::types::{ApiResult, JsonBody, TransferData, TransferRequestData, ok};
use super::helpers::{currency_or, provenance_from_headers};

/// Move funds between two accounts
///
/// POST /api/v1/transfers
///
/// Both legs and their statements commit together or not at all.
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = TransferRequestData,
    responses(
        (status = 200, description = "Transfer committed", body = TransferData, content_type = "application/json"),
        (status = 400, description = "Malformed body, amount or currency"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Invalid type, invalid amount, same account or currency mismatch"),
        (status = 500, description = "Balance update failed"),
        (status = 504, description = "Timed out")
    ),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<TransferRequestData>,
) -> ApiResult<TransferData> {
    let currency = currency_or(req.currency.as_deref(), state.ledger.default_currency())?;
    let amount = parse_amount(&req.amount, &currency)?;

    tracing::info!(
        from = %req.from,
        to = %req.to,
        amount = %req.amount,
        currency = %currency,
        "Transfer request"
    );

    let receipt = state
        .ledger
        .transfer_funds(TransferRequest {
            from: req.from,
            to: req.to,
            amount,
            currency,
            kind: req.kind,
            provenance: provenance_from_headers(&headers),
        })
        .await?;
    ok(receipt.into())
}
