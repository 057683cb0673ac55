//! Shared HTTP plumbing for the REST connectors: a client with the
//! configured timeout, and one-retry-with-backoff for transient failures
//! (network timeouts, upstream 5xx).

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::error::EngineError;

/// Delay before the single retry of a transient failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EngineError::Config(format!("build http client: {e}")))
}

fn request_error(what: &str, error: reqwest::Error) -> EngineError {
    if error.is_timeout() {
        EngineError::Upstream(format!("{what}: request timed out"))
    } else {
        EngineError::Upstream(format!("{what}: {}", error.without_url()))
    }
}

async fn execute(what: &str, request: reqwest::RequestBuilder) -> Result<Value, EngineError> {
    let response = request
        .send()
        .await
        .map_err(|e| request_error(what, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(EngineError::Upstream(format!(
            "{what}: status {}",
            status.as_u16()
        )));
    }
    response
        .json()
        .await
        .map_err(|e| EngineError::Upstream(format!("{what}: decode body: {}", e.without_url())))
}

/// Sends the request and decodes the JSON body; a transient failure is
/// retried once after a short backoff.
pub(crate) async fn request_json(
    what: &str,
    request: reqwest::RequestBuilder,
) -> Result<Value, EngineError> {
    let retry = request.try_clone();
    match execute(what, request).await {
        Err(error) if error.is_transient() => {
            let Some(retry) = retry else {
                return Err(error);
            };
            warn!(operation = what, %error, "transient upstream failure, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            execute(what, retry).await
        }
        other => other,
    }
}

/// Reads a string field out of a JSON object, empty when absent.
pub(crate) fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Reads a nested string (`object.field`), empty when absent.
pub(crate) fn nested_str<'a>(value: &'a Value, object: &str, field: &str) -> &'a str {
    value
        .get(object)
        .and_then(|o| o.get(field))
        .and_then(Value::as_str)
        .unwrap_or_default()
}
