use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use smartrecover::{ChatMessage, ChunkStream, EngineError, LlmClient};

use crate::common;

/// Splits a raw SSE body into `data:` payloads.
fn data_frames(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            frame
                .lines()
                .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect()
}

#[tokio::test]
async fn chat_stream_frames_end_with_done() {
    let server = common::spawn().await;
    let response = server
        .client
        .post(server.url("/chat/stream"))
        .json(&json!({
            "incident_id": "INC001",
            "message": "What is the most likely cause?",
            "conversation_history": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let body = response.text().await.unwrap();
    eprintln!("[e2e] received: {body:?}");
    let frames = data_frames(&body);
    assert!(frames.len() >= 2, "expected chunk frames plus [DONE]: {frames:?}");
    assert_eq!(frames.last().unwrap(), "[DONE]");
    // Chunks concatenate to the scripted mock reply, in order.
    let text: String = frames[..frames.len() - 1].concat();
    assert!(text.contains("correlated change"), "{text}");
}

#[tokio::test]
async fn chat_for_unknown_incident_is_plain_404() {
    let server = common::spawn().await;
    let (status, body) = common::post_json(
        &server,
        "/chat/stream",
        json!({ "incident_id": "INC999", "message": "hello" }),
    )
    .await;
    assert_eq!(status, 404);
    assert!(body["detail"].as_str().unwrap().contains("INC999"));
}

/// LLM that fails once the stream is open: the error surfaces as a chunk,
/// then the stream closes with `[DONE]` and the status stays 200.
struct MidStreamFailureLlm;

#[async_trait]
impl LlmClient for MidStreamFailureLlm {
    fn provider(&self) -> &str {
        "mock"
    }
    fn model(&self) -> &str {
        "mock-model"
    }
    async fn complete(&self, _: &str, _: &[ChatMessage]) -> Result<String, EngineError> {
        Ok("ok".to_string())
    }
    async fn stream(&self, _: &str, _: &[ChatMessage]) -> Result<ChunkStream, EngineError> {
        let chunks = vec![
            Ok("partial ".to_string()),
            Err(EngineError::Upstream("provider reset the stream".to_string())),
        ];
        Ok(futures::stream::iter(chunks).boxed())
    }
}

#[tokio::test]
async fn mid_stream_error_becomes_chunk_then_done() {
    let server = common::spawn_with_llm(Arc::new(MidStreamFailureLlm)).await;
    let response = server
        .client
        .post(server.url("/chat/stream"))
        .json(&json!({ "incident_id": "INC001", "message": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    let frames = data_frames(&body);
    assert_eq!(frames.last().unwrap(), "[DONE]");
    assert!(
        frames.iter().any(|f| f.starts_with("Error:")),
        "expected error chunk: {frames:?}"
    );
}

/// Stream that yields one chunk then hangs; its drop flag shows whether the
/// server released it after the client went away.
struct HangingStream {
    first: Option<String>,
    dropped: Arc<AtomicBool>,
}

impl futures::Stream for HangingStream {
    type Item = Result<String, EngineError>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        match self.first.take() {
            Some(chunk) => Poll::Ready(Some(Ok(chunk))),
            None => Poll::Pending,
        }
    }
}

impl Drop for HangingStream {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

struct HangingLlm {
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl LlmClient for HangingLlm {
    fn provider(&self) -> &str {
        "mock"
    }
    fn model(&self) -> &str {
        "mock-model"
    }
    async fn complete(&self, _: &str, _: &[ChatMessage]) -> Result<String, EngineError> {
        Ok("ok".to_string())
    }
    async fn stream(&self, _: &str, _: &[ChatMessage]) -> Result<ChunkStream, EngineError> {
        Ok(Box::pin(HangingStream {
            first: Some("first chunk".to_string()),
            dropped: self.dropped.clone(),
        }))
    }
}

/// Scenario: client disconnects mid-stream. The LLM stream must be dropped
/// (cancelling the provider call) within a bounded time.
#[tokio::test]
async fn client_disconnect_cancels_the_llm_stream() {
    let dropped = Arc::new(AtomicBool::new(false));
    let server = common::spawn_with_llm(Arc::new(HangingLlm {
        dropped: dropped.clone(),
    }))
    .await;

    let response = server
        .client
        .post(server.url("/chat/stream"))
        .json(&json!({ "incident_id": "INC001", "message": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let mut body = response.bytes_stream();
    let first = body.next().await.expect("first frame").unwrap();
    assert!(String::from_utf8_lossy(&first).contains("first chunk"));
    drop(body);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(
        dropped.load(Ordering::SeqCst),
        "llm stream must be cancelled after client disconnect"
    );
}
