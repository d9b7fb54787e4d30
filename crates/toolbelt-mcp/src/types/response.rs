//! Listing types for `tools/list`, `resources/list`, and `prompts/list`.
//!
//! Call results themselves are built by [`toolbelt::envelope`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbelt::{CapabilityKind, Descriptor, Registry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(
        default,
        rename = "outputSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_schema: Option<Value>,
}

impl From<&Descriptor> for ToolDefinition {
    fn from(d: &Descriptor) -> Self {
        Self {
            name: d.name.clone(),
            title: d.title.clone(),
            description: d.description.clone(),
            input_schema: d.input_schema.to_json_schema(),
            output_schema: d.output_schema.as_ref().map(|s| s.to_json_schema()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResult {
    pub tools: Vec<ToolDefinition>,
    #[serde(default, rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplateDefinition {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceListResult {
    pub resources: Vec<ResourceDefinition>,
    #[serde(default, rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplateListResult {
    #[serde(rename = "resourceTemplates")]
    pub resource_templates: Vec<ResourceTemplateDefinition>,
    #[serde(default, rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Value>,
}

impl From<&Descriptor> for PromptDefinition {
    fn from(d: &Descriptor) -> Self {
        Self {
            name: d.name.clone(),
            title: d.title.clone(),
            description: d.description.clone(),
            arguments: d.input_schema.prompt_arguments(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptListResult {
    pub prompts: Vec<PromptDefinition>,
    #[serde(default, rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ToolListResult {
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            tools: registry
                .list(CapabilityKind::Tool)
                .iter()
                .map(ToolDefinition::from)
                .collect(),
            next_cursor: None,
        }
    }
}

impl ResourceListResult {
    /// Resources at a fixed URI. Templated ones are listed separately.
    pub fn from_registry(registry: &Registry) -> Self {
        let resources = registry
            .list(CapabilityKind::Resource)
            .iter()
            .filter_map(|d| {
                let locator = d.resource.as_ref()?;
                (!locator.uri.is_template()).then(|| ResourceDefinition {
                    uri: locator.uri.as_str().to_string(),
                    name: d.name.clone(),
                    description: d.description.clone(),
                    mime_type: locator.mime_type.clone(),
                })
            })
            .collect();
        Self {
            resources,
            next_cursor: None,
        }
    }
}

impl ResourceTemplateListResult {
    pub fn from_registry(registry: &Registry) -> Self {
        let resource_templates = registry
            .list(CapabilityKind::Resource)
            .iter()
            .filter_map(|d| {
                let locator = d.resource.as_ref()?;
                locator
                    .uri
                    .is_template()
                    .then(|| ResourceTemplateDefinition {
                        uri_template: locator.uri.as_str().to_string(),
                        name: d.name.clone(),
                        description: d.description.clone(),
                        mime_type: locator.mime_type.clone(),
                    })
            })
            .collect();
        Self {
            resource_templates,
            next_cursor: None,
        }
    }
}

impl PromptListResult {
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            prompts: registry
                .list(CapabilityKind::Prompt)
                .iter()
                .map(PromptDefinition::from)
                .collect(),
            next_cursor: None,
        }
    }
}
