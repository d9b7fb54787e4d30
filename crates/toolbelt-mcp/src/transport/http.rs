//! HTTP transport — JSON-RPC over `POST /mcp`, plus `GET /health`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult, RequestId};

/// HTTP transport for web-based MCP clients. Requests are served
/// concurrently; every one goes through the same shared dispatcher.
pub struct HttpTransport {
    handler: Arc<ProtocolHandler>,
}

impl HttpTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/mcp", post(handle_request))
            .route("/health", get(handle_health))
            .layer(CorsLayer::permissive())
            .with_state(self.handler.clone())
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

async fn handle_request(
    State(handler): State<Arc<ProtocolHandler>>,
    AxumJson(body): AxumJson<Value>,
) -> Response {
    let msg = match serde_json::from_value(body) {
        Ok(msg) => msg,
        Err(e) => {
            let error = McpError::ParseError(e.to_string()).to_json_rpc_error(RequestId::Null);
            return (StatusCode::BAD_REQUEST, AxumJson(error)).into_response();
        }
    };

    match handler.handle_message(msg).await {
        Some(response) => AxumJson(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handle_health(State(handler): State<Arc<ProtocolHandler>>) -> AxumJson<Value> {
    let registry = handler.dispatcher().registry();
    AxumJson(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": registry.len(toolbelt::CapabilityKind::Tool),
    }))
}
