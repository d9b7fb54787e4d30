//! Main request dispatcher — receives JSON-RPC messages, routes to handlers.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use toolbelt::{build_envelope, Dispatcher, InvocationOutcome, InvocationRequest, Registry};

use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// The protocol handler: JSON-RPC in, JSON-RPC out. Cheap to clone; clones
/// share the dispatcher and negotiation state.
#[derive(Clone)]
pub struct ProtocolHandler {
    dispatcher: Dispatcher,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
}

impl ProtocolHandler {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        match self.dispatch_request(&request).await {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => {
                tracing::debug!("{} failed: {e}", request.method);
                serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
            }
        }
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request).await,
            "shutdown" => {
                tracing::info!("Shutdown requested");
                Ok(empty())
            }
            "ping" => Ok(empty()),

            "tools/list" => to_value(ToolListResult::from_registry(self.dispatcher.registry())),
            "tools/call" => self.handle_tools_call(request).await,

            "resources/list" => {
                to_value(ResourceListResult::from_registry(self.dispatcher.registry()))
            }
            "resources/templates/list" => to_value(ResourceTemplateListResult::from_registry(
                self.dispatcher.registry(),
            )),
            "resources/read" => self.handle_resources_read(request).await,

            "prompts/list" => to_value(PromptListResult::from_registry(self.dispatcher.registry())),
            "prompts/get" => self.handle_prompts_get(request).await,

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.capabilities.lock().await.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                let params = notification
                    .params
                    .map(serde_json::from_value::<CancelledParams>)
                    .and_then(Result::ok);
                match params {
                    Some(p) => tracing::info!(
                        "Client cancelled request {} ({})",
                        p.request_id,
                        p.reason.as_deref().unwrap_or("no reason given")
                    ),
                    None => tracing::info!("Received cancellation notification"),
                }
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        let params: InitializeParams = request.params_as()?;
        let result = self.capabilities.lock().await.negotiate(params);
        to_value(result)
    }

    /// Tool failures travel inside the result as `isError` envelopes.
    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        let params: ToolCallParams = request.params_as()?;
        let outcome = self
            .dispatcher
            .invoke(InvocationRequest::CallTool {
                name: params.name,
                arguments: params.arguments,
            })
            .await;
        Ok(build_envelope(outcome).to_value())
    }

    async fn handle_resources_read(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        let params: ResourceReadParams = request.params_as()?;
        let outcome = self
            .dispatcher
            .invoke(InvocationRequest::read_resource(params.uri))
            .await;
        into_result(outcome)
    }

    async fn handle_prompts_get(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        let params: PromptGetParams = request.params_as()?;
        let outcome = self
            .dispatcher
            .invoke(InvocationRequest::GetPrompt {
                name: params.name,
                arguments: params.arguments,
            })
            .await;
        into_result(outcome)
    }
}

/// Resources and prompts have no error envelope; failures become JSON-RPC errors.
fn into_result(outcome: InvocationOutcome) -> McpResult<Value> {
    match outcome {
        InvocationOutcome::Failure(failure) => Err(McpError::Invocation(failure)),
        success => Ok(build_envelope(success).to_value()),
    }
}

fn to_value(value: impl Serialize) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

fn empty() -> Value {
    Value::Object(serde_json::Map::new())
}
