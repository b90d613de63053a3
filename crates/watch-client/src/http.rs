use reqwest::StatusCode;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use watch_core::WatchError;

const MAX_BODY_CHARS: usize = 200;

/// Sends once and maps every failure into a [`WatchError`]. Non-success
/// statuses become `Rejected`; everything before a status arrives is `Transport`.
pub async fn send_checked(builder: RequestBuilder) -> Result<Response, WatchError> {
    let response = builder.send().await.map_err(WatchError::transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "request rejected");
    Err(WatchError::Rejected {
        status: status.as_u16(),
        message: rejection_message(status, &body),
    })
}

pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, WatchError> {
    let bytes = response.bytes().await.map_err(WatchError::transport)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| WatchError::Transport(format!("decode response: {err}")))
}

/// Picks a human-readable message out of an error body.
fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(MAX_BODY_CHARS).collect();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string()
}
