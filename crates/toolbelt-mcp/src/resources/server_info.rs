//! Resource: server://info

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Serialize;
use toolbelt::{
    Arguments, CapabilityKind, ContentBlock, Descriptor, HandlerError, HandlerResult, Registry,
    RegistryError, ResourceHandler,
};

use crate::types::{MCP_VERSION, SERVER_NAME, SERVER_VERSION};

pub const URI: &str = "server://info";

/// Snapshot of what the server offers, taken once the registry is complete.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSummary {
    pub name: String,
    pub version: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub tools: Vec<String>,
    pub resources: Vec<String>,
    pub prompts: Vec<String>,
}

impl ServerSummary {
    pub fn from_registry(registry: &Registry) -> Self {
        let names = |kind: CapabilityKind| {
            registry
                .list(kind)
                .iter()
                .map(|d| d.name.clone())
                .collect::<Vec<_>>()
        };
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
            protocol_version: MCP_VERSION.to_string(),
            tools: names(CapabilityKind::Tool),
            resources: names(CapabilityKind::Resource),
            prompts: names(CapabilityKind::Prompt),
        }
    }
}

/// The resource lives inside the registry it describes, so the summary is
/// filled in after registration finishes.
pub struct ServerInfoResource {
    summary: Arc<OnceLock<ServerSummary>>,
}

#[async_trait]
impl ResourceHandler for ServerInfoResource {
    async fn read(&self, _uri: &str, _vars: Arguments) -> HandlerResult<Vec<ContentBlock>> {
        let summary = self
            .summary
            .get()
            .ok_or_else(|| HandlerError::new("Server info is not available yet"))?;
        let text = serde_json::to_string_pretty(summary)
            .map_err(|e| HandlerError::new(format!("Failed to encode server info: {e}")))?;
        Ok(vec![ContentBlock::text(text)])
    }
}

pub fn descriptor(summary: Arc<OnceLock<ServerSummary>>) -> Result<Descriptor, RegistryError> {
    Ok(
        Descriptor::resource("server_info", URI, ServerInfoResource { summary })?
            .mime_type("application/json")
            .describe("Server name, version, and the capabilities it offers"),
    )
}
