//! Incident endpoints: list, detail, status update, cached details, and
//! explicit context retrieval.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use smartrecover::{AgentData, Incident, IncidentStatus};

use crate::app::AppState;
use crate::error::ApiError;

/// Ordered by `created_at` descending, ties broken by `id` ascending.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Incident>>, ApiError> {
    let mut incidents = state.incidents.list_incidents().await?;
    incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(Json(incidents))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Incident>, ApiError> {
    Ok(Json(state.incidents.get_incident(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Incident>, ApiError> {
    let status: IncidentStatus = body
        .status
        .parse()
        .map_err(|message: String| ApiError::invalid_input(message))?;
    Ok(Json(state.incidents.update_status(&id, status).await?))
}

#[derive(Debug, Serialize)]
pub struct DetailsResponse {
    incident: Incident,
    agent_results: Option<AgentData>,
}

/// Incident plus cached agent results (never triggers retrieval).
pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let (incident, agent_results) = state.orchestrator.details(&id).await?;
    Ok(Json(DetailsResponse {
        incident,
        agent_results,
    }))
}

/// Runs the agent graph (no synthesis), refreshes the cache, and returns
/// the exclusion-filtered results.
pub async fn retrieve_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentData>, ApiError> {
    let data = state.orchestrator.retrieve(&id, "").await?;
    Ok(Json(state.orchestrator.filtered(&id, data, &[])))
}
