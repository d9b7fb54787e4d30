//! Registry bootstrap: every capability the server offers, registered once.

use std::sync::{Arc, OnceLock};

use toolbelt::{CapabilityKind, Registry, UnknownFields};

use crate::config::ServerConfig;
use crate::prompts::{code_review, weather_briefing};
use crate::resources::{greeting, server_info, ServerSummary};
use crate::tools;
use crate::types::McpResult;

/// Build the registry in listing order. Any registration failure, such as a
/// duplicate name, aborts startup.
pub fn build_registry(config: &ServerConfig) -> McpResult<Registry> {
    let mut registry = Registry::new();

    for mut tool in tools::descriptors(config)? {
        if config.strict_args {
            tool.input_schema.unknown_fields = UnknownFields::Reject;
        }
        registry.register(tool)?;
    }

    let summary = Arc::new(OnceLock::new());
    registry.register(server_info::descriptor(summary.clone())?)?;
    registry.register(greeting::descriptor()?)?;

    registry.register(code_review::descriptor())?;
    registry.register(weather_briefing::descriptor())?;

    // The cell is fresh, so this set always succeeds.
    let _ = summary.set(ServerSummary::from_registry(&registry));

    tracing::info!(
        "Registered {} tools, {} resources, {} prompts",
        registry.len(CapabilityKind::Tool),
        registry.len(CapabilityKind::Resource),
        registry.len(CapabilityKind::Prompt),
    );
    Ok(registry)
}
