pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::ledger::LedgerService;
use state::AppState;

/// Build the HTTP router over a ledger service
pub fn build_router(ledger: Arc<LedgerService>) -> Router {
    let state = Arc::new(AppState::new(ledger));

    let account_routes = Router::new()
        .route("/id/{id}", get(handlers::get_account_by_id))
        .route("/{account_id}", get(handlers::get_account))
        .route("/{account_id}/balance", get(handlers::get_balance))
        .route("/{account_id}/fund", post(handlers::fund_account))
        .route("/{account_id}/movements", get(handlers::get_movements));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/accounts", post(handlers::create_account))
        .nest("/api/v1/accounts", account_routes)
        .route(
            "/api/v1/persons/{person_id}/accounts",
            get(handlers::list_person_accounts),
        )
        .route("/api/v1/transfers", post(handlers::create_transfer))
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Start HTTP Gateway server
pub async fn run_server(host: &str, port: u16, ledger: Arc<LedgerService>) -> anyhow::Result<()> {
    let app = build_router(ledger);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Failed to bind gateway");
        e
    })?;

    tracing::info!(addr = %addr, "Gateway listening");
    tracing::info!("Swagger UI at http://{}/docs", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
