//! Streaming chat endpoint (SSE).
//!
//! Frames are exactly `data: <chunk>\n\n` with a single terminal
//! `data: [DONE]\n\n`. A mid-stream LLM error becomes one error chunk
//! followed by `[DONE]`; the HTTP status never changes mid-response.
//! When the client disconnects, axum drops the body stream, which drops
//! the LLM chunk stream and aborts the provider request; the drop guard
//! logs the cancellation.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::StreamExt;
use tracing::{info, warn};

use smartrecover::ChatRequest;

use crate::app::AppState;
use crate::error::ApiError;

/// Logs `cancelled` if the SSE generator is dropped before completion.
struct CancelGuard {
    incident_id: String,
    completed: bool,
}

impl CancelGuard {
    fn new(incident_id: String) -> Self {
        Self {
            incident_id,
            completed: false,
        }
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.completed {
            info!(
                incident = %self.incident_id,
                kind = "cancelled",
                "chat stream cancelled by client; llm stream dropped"
            );
        }
    }
}

pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.incident_id.is_empty() {
        return Err(ApiError::invalid_input("incident_id must not be empty"));
    }
    // Errors before the first token (unknown incident, provider refusing
    // the request) still map to plain HTTP errors.
    let chunks = state.orchestrator.chat_stream(&request).await?;
    let incident_id = request.incident_id.clone();

    let sse_stream = async_stream::stream! {
        let mut guard = CancelGuard::new(incident_id.clone());
        let mut chunks = std::pin::pin!(chunks);
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => yield Ok::<_, Infallible>(Event::default().data(text)),
                Err(e) => {
                    warn!(incident = %incident_id, error = %e, "llm stream failed mid-chat");
                    yield Ok(Event::default().data(format!("Error: {e}")));
                    break;
                }
            }
        }
        guard.complete();
        yield Ok(Event::default().data("[DONE]"));
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(sse_stream),
    ))
}
