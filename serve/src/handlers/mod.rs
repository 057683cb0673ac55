//! Request handlers, grouped by surface.

pub mod admin;
pub mod chat;
pub mod exclusions;
pub mod incidents;
pub mod resolve;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
