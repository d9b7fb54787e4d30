//! MCP capability negotiation during initialization.

use crate::types::{ClientCapabilities, InitializeParams, InitializeResult, MCP_VERSION};

/// Stored client capabilities after negotiation.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_name: Option<String>,
    pub initialized: bool,
}

impl NegotiatedCapabilities {
    /// Accept any client version; the server always answers with its own.
    pub fn negotiate(&mut self, params: InitializeParams) -> InitializeResult {
        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                "Client requested protocol version {}, server supports {}. Proceeding with server version.",
                params.protocol_version,
                MCP_VERSION
            );
        }

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );
        self.client = params.capabilities;
        self.client_name = Some(params.client_info.name);

        InitializeResult::default_result()
    }

    pub fn mark_initialized(&mut self) {
        if self.initialized {
            tracing::debug!("Duplicate initialized notification");
            return;
        }
        self.initialized = true;
        tracing::info!("MCP handshake complete ({})", self.summary());
    }

    /// Who the client is and which optional client features it declared.
    pub fn summary(&self) -> String {
        let declared = |cap: &Option<serde_json::Value>| if cap.is_some() { "yes" } else { "no" };
        format!(
            "client: {}, sampling: {}, roots: {}",
            self.client_name.as_deref().unwrap_or("unknown"),
            declared(&self.client.sampling),
            declared(&self.client.roots),
        )
    }
}
