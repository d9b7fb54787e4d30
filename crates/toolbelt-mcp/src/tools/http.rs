//! Shared HTTP client for tools that call external services.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use toolbelt::HandlerError;

use crate::config::ServerConfig;
use crate::types::{McpError, McpResult};

/// Build the client every HTTP-calling tool shares. Nominatim rejects
/// requests without a user agent.
pub fn build_client(config: &ServerConfig) -> McpResult<Client> {
    Client::builder()
        .timeout(config.http_timeout)
        .user_agent(format!("toolbelt-mcp/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| McpError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Fail on transport errors and non-success statuses. The error names the
/// upstream service; the body is included, truncated, for non-success codes.
pub async fn check(
    service: &str,
    result: Result<Response, reqwest::Error>,
) -> Result<Response, HandlerError> {
    let response = result.map_err(|e| {
        tracing::warn!("{service} request failed: {e}");
        HandlerError::new(format!("{service} request failed: {e}"))
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!("{service} returned {status}");
    Err(HandlerError::new(format!(
        "{service} returned {status}: {}",
        truncate(body.trim(), 200)
    )))
}

pub async fn json<T: DeserializeOwned>(service: &str, response: Response) -> Result<T, HandlerError> {
    response
        .json::<T>()
        .await
        .map_err(|e| HandlerError::new(format!("Unexpected {service} response: {e}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
