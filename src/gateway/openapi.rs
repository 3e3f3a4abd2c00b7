//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    AccountData, BalanceData, CreateAccountRequest, FundRequest, MovementSummaryData,
    StatementData, TransferData, TransferRequestData,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fund Ledger API",
        version = "0.1.0",
        description = "Per-account balances, append-only statements and atomic two-leg transfers.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::account::create_account,
        crate::gateway::handlers::account::get_account,
        crate::gateway::handlers::account::get_account_by_id,
        crate::gateway::handlers::account::list_person_accounts,
        crate::gateway::handlers::account::get_balance,
        crate::gateway::handlers::account::fund_account,
        crate::gateway::handlers::account::get_movements,
        crate::gateway::handlers::transfer::create_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            CreateAccountRequest,
            AccountData,
            FundRequest,
            BalanceData,
            StatementData,
            MovementSummaryData,
            TransferRequestData,
            TransferData,
        )
    ),
    tags(
        (name = "System", description = "Health"),
        (name = "Account", description = "Account registration and lookup"),
        (name = "Balance", description = "Balances, funding and movements"),
        (name = "Transfer", description = "Atomic fund transfers"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_ledger_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/v1/health",
            "/api/v1/accounts",
            "/api/v1/accounts/id/{id}",
            "/api/v1/accounts/{account_id}/balance",
            "/api/v1/accounts/{account_id}/fund",
            "/api/v1/accounts/{account_id}/movements",
            "/api/v1/transfers",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {}",
                expected
            );
        }
    }
}
