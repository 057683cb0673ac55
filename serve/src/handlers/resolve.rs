//! Blocking resolve endpoint: graph + LLM synthesis, structured response.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use smartrecover::ResolveResponse;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    incident_id: String,
    #[serde(default)]
    user_query: String,
}

pub async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    if request.incident_id.is_empty() {
        return Err(ApiError::invalid_input("incident_id must not be empty"));
    }
    let response = state
        .orchestrator
        .resolve(&request.incident_id, &request.user_query)
        .await?;
    Ok(Json(response))
}
