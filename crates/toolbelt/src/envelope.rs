//! Response envelopes — the MCP result shapes built from an outcome.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{ContentBlock, PromptMessage};
use crate::dispatch::{InvocationOutcome, SuccessPayload};

/// Result of `tools/call`, also used for every failure envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(
        default,
        rename = "structuredContent",
        skip_serializing_if = "Option::is_none"
    )]
    pub structured_content: Option<Value>,
    #[serde(default, rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            structured_content: None,
            is_error: Some(true),
        }
    }
}

/// One entry of a `resources/read` result. Exactly one of `text`/`blob` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// The uniform response wrapper for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Tool(CallToolResult),
    Resource(ReadResourceResult),
    Prompt(GetPromptResult),
    Error(CallToolResult),
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error(_))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self)
            .unwrap_or_else(|e| serde_json::json!({
                "content": [{ "type": "text", "text": format!("Failed to serialize result: {e}") }],
                "isError": true,
            }))
    }
}

/// Wrap an outcome in its response envelope.
pub fn build(outcome: InvocationOutcome) -> Envelope {
    match outcome {
        InvocationOutcome::Success(SuccessPayload::Tool {
            content,
            structured,
        }) => Envelope::Tool(CallToolResult {
            content,
            structured_content: structured,
            is_error: None,
        }),
        InvocationOutcome::Success(SuccessPayload::Resource {
            uri,
            mime_type,
            content,
        }) => Envelope::Resource(ReadResourceResult {
            contents: content
                .into_iter()
                .map(|block| resource_contents(&uri, mime_type.as_deref(), block))
                .collect(),
        }),
        InvocationOutcome::Success(SuccessPayload::Prompt {
            description,
            messages,
        }) => Envelope::Prompt(GetPromptResult {
            description,
            messages,
        }),
        InvocationOutcome::Failure(failure) => Envelope::Error(CallToolResult::error(failure.message)),
    }
}

fn resource_contents(uri: &str, mime_type: Option<&str>, block: ContentBlock) -> ResourceContents {
    match block {
        ContentBlock::Text { text } => ResourceContents {
            uri: uri.to_string(),
            mime_type: mime_type.map(str::to_string),
            text: Some(text),
            blob: None,
        },
        ContentBlock::Image { data, mime_type } => ResourceContents {
            uri: uri.to_string(),
            mime_type: Some(mime_type),
            text: None,
            blob: Some(base64::engine::general_purpose::STANDARD.encode(data)),
        },
    }
}
