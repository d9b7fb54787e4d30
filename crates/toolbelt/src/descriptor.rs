//! Capability descriptors and the handler traits they bind.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::{ContentBlock, PromptMessage};
use crate::registry::RegistryError;
use crate::schema::{FieldSpec, ObjectSchema};
use crate::uri_template::UriTemplate;

/// Validated, defaulted arguments handed to a handler.
pub type Arguments = Map<String, Value>;

/// The three independent capability namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Tool,
    Resource,
    Prompt,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 3] = [
        CapabilityKind::Tool,
        CapabilityKind::Resource,
        CapabilityKind::Prompt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Tool => "tool",
            CapabilityKind::Resource => "resource",
            CapabilityKind::Prompt => "prompt",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a handler. The message reaches the caller verbatim.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Successful tool result: ordered content plus an optional structured payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    pub structured: Option<Value>,
}

impl ToolOutput {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            structured: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ContentBlock::text(text)])
    }

    pub fn with_structured(mut self, structured: Value) -> Self {
        self.structured = Some(structured);
        self
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Arguments) -> HandlerResult<ToolOutput>;
}

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Read the resource at `uri`. `vars` holds the validated template variables.
    async fn read(&self, uri: &str, vars: Arguments) -> HandlerResult<Vec<ContentBlock>>;
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn get(&self, args: Arguments) -> HandlerResult<Vec<PromptMessage>>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct ToolFn<F>(pub F);

#[async_trait]
impl<F, Fut> ToolHandler for ToolFn<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<ToolOutput>> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> HandlerResult<ToolOutput> {
        (self.0)(args).await
    }
}

/// Adapter turning an async closure into a [`ResourceHandler`].
pub struct ResourceFn<F>(pub F);

#[async_trait]
impl<F, Fut> ResourceHandler for ResourceFn<F>
where
    F: Fn(String, Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Vec<ContentBlock>>> + Send + 'static,
{
    async fn read(&self, uri: &str, vars: Arguments) -> HandlerResult<Vec<ContentBlock>> {
        (self.0)(uri.to_string(), vars).await
    }
}

/// Adapter turning an async closure into a [`PromptHandler`].
pub struct PromptFn<F>(pub F);

#[async_trait]
impl<F, Fut> PromptHandler for PromptFn<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Vec<PromptMessage>>> + Send + 'static,
{
    async fn get(&self, args: Arguments) -> HandlerResult<Vec<PromptMessage>> {
        (self.0)(args).await
    }
}

/// The bound handler. Its variant determines the descriptor's kind.
#[derive(Clone)]
pub enum Handler {
    Tool(Arc<dyn ToolHandler>),
    Resource(Arc<dyn ResourceHandler>),
    Prompt(Arc<dyn PromptHandler>),
}

impl Handler {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Handler::Tool(_) => CapabilityKind::Tool,
            Handler::Resource(_) => CapabilityKind::Resource,
            Handler::Prompt(_) => CapabilityKind::Prompt,
        }
    }
}

/// Where a resource lives and what it returns.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    pub uri: UriTemplate,
    pub mime_type: Option<String>,
}

/// Registered metadata and handler for one capability.
#[derive(Clone)]
pub struct Descriptor {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub input_schema: ObjectSchema,
    pub output_schema: Option<ObjectSchema>,
    pub resource: Option<ResourceLocator>,
    handler: Handler,
}

impl Descriptor {
    fn with_handler(name: impl Into<String>, input_schema: ObjectSchema, handler: Handler) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            input_schema,
            output_schema: None,
            resource: None,
            handler,
        }
    }

    pub fn tool(
        name: impl Into<String>,
        input_schema: ObjectSchema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self::with_handler(name, input_schema, Handler::Tool(Arc::new(handler)))
    }

    /// A resource at a fixed URI or a URI template. The input schema is
    /// derived from the template variables (each a required string) and can
    /// be tightened with [`Descriptor::input_schema`].
    pub fn resource(
        name: impl Into<String>,
        uri: &str,
        handler: impl ResourceHandler + 'static,
    ) -> Result<Self, RegistryError> {
        let uri = UriTemplate::parse(uri)?;
        let schema = uri
            .variables()
            .fold(ObjectSchema::new(), |schema, var| schema.field(FieldSpec::string(var)));
        let mut descriptor =
            Self::with_handler(name, schema, Handler::Resource(Arc::new(handler)));
        descriptor.resource = Some(ResourceLocator {
            uri,
            mime_type: None,
        });
        Ok(descriptor)
    }

    pub fn prompt(
        name: impl Into<String>,
        input_schema: ObjectSchema,
        handler: impl PromptHandler + 'static,
    ) -> Self {
        Self::with_handler(name, input_schema, Handler::Prompt(Arc::new(handler)))
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn input_schema(mut self, schema: ObjectSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Declare the shape of the structured payload. Tools only; the
    /// registry rejects it on other kinds.
    pub fn output_schema(mut self, schema: ObjectSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Set the MIME type of a resource. No effect on tools and prompts.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        if let Some(locator) = self.resource.as_mut() {
            locator.mime_type = Some(mime_type.into());
        }
        self
    }

    pub fn kind(&self) -> CapabilityKind {
        self.handler.kind()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Qualified name used in logs and failure messages, e.g. `tool/greet`.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.kind(), self.name)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("kind", &self.kind())
            .field("name", &self.name)
            .field("title", &self.title)
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}
