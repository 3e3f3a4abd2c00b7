//! Account, balance and movement handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap};

use crate::ledger::NewAccount;
use crate::money::{Currency, parse_amount};

use super::super::state::AppState;
use super::super::types::{
    AccountData, ApiResult, BalanceData, CreateAccountRequest, FundRequest, JsonBody,
    MovementSummaryData, PathParam, ok,
};
use super::helpers::{currency_or, provenance_from_headers};

/// Register an account
///
/// POST /api/v1/accounts
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 200, description = "Account registered", body = AccountData, content_type = "application/json"),
        (status = 400, description = "Malformed body, missing field or invalid currency"),
        (status = 409, description = "Account already exists")
    ),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<CreateAccountRequest>,
) -> ApiResult<AccountData> {
    let opening_currency = req.currency.as_deref().map(Currency::new).transpose()?;
    let provenance = provenance_from_headers(&headers);

    let account = state
        .ledger
        .create_account(
            NewAccount {
                account_id: req.account_id,
                person_id: req.person_id,
                tenant_id: req.tenant_id,
                user_last_update: provenance.user_last_update,
            },
            opening_currency,
        )
        .await?;
    ok(account.into())
}

/// Get an account by business key
///
/// GET /api/v1/accounts/{account_id}
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}",
    params(("account_id" = String, Path, description = "Account business key")),
    responses(
        (status = 200, description = "Account", body = AccountData, content_type = "application/json"),
        (status = 404, description = "Account not found")
    ),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    PathParam(account_id): PathParam<String>,
) -> ApiResult<AccountData> {
    let account = state.ledger.get_account(&account_id).await?;
    ok(account.into())
}

/// Get an account by its numeric id
///
/// GET /api/v1/accounts/id/{id}
#[utoipa::path(
    get,
    path = "/api/v1/accounts/id/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = AccountData, content_type = "application/json"),
        (status = 400, description = "Id is not an integer"),
        (status = 404, description = "Account not found")
    ),
    tag = "Account"
)]
pub async fn get_account_by_id(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<AccountData> {
    let account = state.ledger.get_account_by_id(id).await?;
    ok(account.into())
}

/// List the accounts of one person
///
/// GET /api/v1/persons/{person_id}/accounts
#[utoipa::path(
    get,
    path = "/api/v1/persons/{person_id}/accounts",
    params(("person_id" = String, Path, description = "Owning person")),
    responses(
        (status = 200, description = "Accounts, newest first", body = Vec<AccountData>, content_type = "application/json")
    ),
    tag = "Account"
)]
pub async fn list_person_accounts(
    State(state): State<Arc<AppState>>,
    PathParam(person_id): PathParam<String>,
) -> ApiResult<Vec<AccountData>> {
    let accounts = state.ledger.list_accounts_by_person(&person_id).await?;
    ok(accounts.into_iter().map(Into::into).collect())
}

/// Current balance
///
/// GET /api/v1/accounts/{account_id}/balance
///
/// An account that was never funded has no balance and answers 404.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}/balance",
    params(("account_id" = String, Path, description = "Account business key")),
    responses(
        (status = 200, description = "Balance", body = BalanceData, content_type = "application/json"),
        (status = 404, description = "Account or balance not found")
    ),
    tag = "Balance"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    PathParam(account_id): PathParam<String>,
) -> ApiResult<BalanceData> {
    let balance = state.ledger.get_balance(&account_id).await?;
    ok(balance.into())
}

/// Add funds to (or adjust) a balance
///
/// POST /api/v1/accounts/{account_id}/fund
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{account_id}/fund",
    params(("account_id" = String, Path, description = "Account business key")),
    request_body = FundRequest,
    responses(
        (status = 200, description = "Balance after funding", body = BalanceData, content_type = "application/json"),
        (status = 400, description = "Malformed amount or currency"),
        (status = 404, description = "Account not found"),
        (status = 409, description = "Zero amount or currency mismatch")
    ),
    tag = "Balance"
)]
pub async fn fund_account(
    State(state): State<Arc<AppState>>,
    PathParam(account_id): PathParam<String>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<FundRequest>,
) -> ApiResult<BalanceData> {
    let currency = currency_or(req.currency.as_deref(), state.ledger.default_currency())?;
    let delta = parse_amount(&req.amount, &currency)?;

    let balance = state
        .ledger
        .add_fund_balance(
            &account_id,
            delta,
            Some(currency),
            provenance_from_headers(&headers),
        )
        .await?;
    ok(balance.into())
}

/// Balance, credit/debit totals and recent statements
///
/// GET /api/v1/accounts/{account_id}/movements
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}/movements",
    params(("account_id" = String, Path, description = "Account business key")),
    responses(
        (status = 200, description = "Movement summary", body = MovementSummaryData, content_type = "application/json"),
        (status = 404, description = "Account or balance not found")
    ),
    tag = "Balance"
)]
pub async fn get_movements(
    State(state): State<Arc<AppState>>,
    PathParam(account_id): PathParam<String>,
) -> ApiResult<MovementSummaryData> {
    let summary = state.ledger.get_movement_summary(&account_id).await?;
    ok(summary.into())
}
