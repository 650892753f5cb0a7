//! API handlers for running simulations and discovering policies

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use serde_json::{Value, json};
use voucher_core::domain::SimulationResult;
use voucher_sim::SimulationRequest;

use crate::error::ApiError;
use crate::server::AppState;

/// Body of `GET /policies`.
#[derive(Debug, Serialize)]
pub struct PoliciesResponse {
    /// Registered strategy names, sorted
    pub policies: Vec<&'static str>,
}

/// Validates the body, runs one simulation and returns its timeline.
///
/// # Errors
///
/// - `ApiError::InvalidBody` / `ApiError::Validation` - Rejected before any allocator call
/// - `ApiError::Simulation` - If the run aborts
pub async fn simulate(
    State(state): State<AppState>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Json<SimulationResult>, ApiError> {
    let Json(request) = payload?;
    let params = request.into_params(state.orchestrator.registry(), &state.limits)?;
    let result = state.orchestrator.run(params).await?;
    Ok(Json(result))
}

/// Lists the strategies `POST /simulate` accepts.
pub async fn policies(State(state): State<AppState>) -> Json<PoliciesResponse> {
    Json(PoliciesResponse {
        policies: state.orchestrator.registry().names(),
    })
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
