//! Excluded-item management for one incident.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use smartrecover::ExcludedItem;

use crate::app::AppState;
use crate::error::ApiError;

pub async fn exclude_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(item): Json<ExcludedItem>,
) -> Result<Json<Value>, ApiError> {
    if item.item_id.is_empty() {
        return Err(ApiError::invalid_input("item_id must not be empty"));
    }
    // Validate the incident exists so typos do not grow silent state.
    state.incidents.get_incident(&id).await?;
    let newly_added = state.exclusions.add(&id, item.clone());
    Ok(Json(json!({
        "status": "excluded",
        "incident_id": id,
        "item_id": item.item_id,
        "already_present": !newly_added,
    })))
}

pub async fn list_excluded(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.incidents.get_incident(&id).await?;
    let items = state.exclusions.list(&id);
    Ok(Json(json!({
        "incident_id": id,
        "excluded_items": items,
    })))
}

pub async fn remove_excluded(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    if !state.exclusions.remove(&id, &item_id) {
        return Err(ApiError::not_found(format!(
            "excluded item {item_id} for incident {id}"
        )));
    }
    Ok(Json(json!({
        "status": "removed",
        "incident_id": id,
        "item_id": item_id,
    })))
}
