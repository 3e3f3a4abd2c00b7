use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, error_codes, ok};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Unix millis when the check ran
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    /// `postgres` or `memory`
    #[schema(example = "postgres")]
    pub store: String,
    /// Crate version and git revision
    #[schema(example = "0.1.0+3f9c2ab")]
    pub version: String,
}

/// Liveness of the ledger store
///
/// GET /api/v1/health
///
/// 503 with code 5001 when the store cannot run a trivial query.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Store unreachable")
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    if let Err(e) = state.ledger.health_check().await {
        tracing::error!(store = state.ledger.store_name(), error = %e, "Health check failed");
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            "unavailable",
        ));
    }

    ok(HealthResponse {
        timestamp_ms: Utc::now().timestamp_millis(),
        store: state.ledger.store_name().to_string(),
        version: env!("GIT_HASH").to_string(),
    })
}
