//! HTTP server for SmartRecover (axum + SSE).
//!
//! Routes live under `/api/v1`; streaming chat uses Server-Sent Events.
//!
//! **Public API**: [`AppState`], [`router`], [`run_serve`],
//! [`run_serve_on_listener`].

mod app;
mod error;
mod handlers;
mod trace;

pub use app::{router, AppState};
pub use trace::TRACE_HEADER;

use tokio::net::TcpListener;
use tracing::info;

/// Serves on an existing listener. Used by tests: bind to `127.0.0.1:0`,
/// then pass the listener here.
pub async fn run_serve_on_listener(
    listener: TcpListener,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("smartrecover api listening on http://{}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Binds `addr` and serves until ctrl-c.
pub async fn run_serve(
    addr: &str,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, state).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; serve until the task is dropped.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
