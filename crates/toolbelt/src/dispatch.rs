//! The dispatcher — lookup, validate, invoke, check output, normalize.
//!
//! Every failure mode ends here as an [`InvocationOutcome::Failure`]; nothing
//! a capability does can escape as a panic or error past [`Dispatcher::invoke`].

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::content::{ContentBlock, PromptMessage};
use crate::descriptor::{CapabilityKind, Descriptor, Handler, HandlerResult};
use crate::registry::Registry;
use crate::validate::{validate, ValidationResult};

/// One caller request. Each capability kind has its own addressing.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationRequest {
    CallTool {
        name: String,
        arguments: Option<Value>,
    },
    ReadResource {
        uri: String,
    },
    GetPrompt {
        name: String,
        arguments: Option<Value>,
    },
}

impl InvocationRequest {
    pub fn call_tool(name: impl Into<String>, arguments: Value) -> Self {
        InvocationRequest::CallTool {
            name: name.into(),
            arguments: Some(arguments),
        }
    }

    pub fn read_resource(uri: impl Into<String>) -> Self {
        InvocationRequest::ReadResource { uri: uri.into() }
    }

    pub fn get_prompt(name: impl Into<String>, arguments: Value) -> Self {
        InvocationRequest::GetPrompt {
            name: name.into(),
            arguments: Some(arguments),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            InvocationRequest::CallTool { .. } => CapabilityKind::Tool,
            InvocationRequest::ReadResource { .. } => CapabilityKind::Resource,
            InvocationRequest::GetPrompt { .. } => CapabilityKind::Prompt,
        }
    }

    /// The name (or URI, for resources) the request addresses.
    pub fn target(&self) -> &str {
        match self {
            InvocationRequest::CallTool { name, .. } | InvocationRequest::GetPrompt { name, .. } => {
                name
            }
            InvocationRequest::ReadResource { uri } => uri,
        }
    }
}

/// Which stage of the pipeline rejected the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Lookup,
    Validation,
    Handler,
    OutputContract,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Lookup => "lookup",
            FailureKind::Validation => "validation",
            FailureKind::Handler => "handler",
            FailureKind::OutputContract => "output_contract",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationFailure {
    pub capability: CapabilityKind,
    pub kind: FailureKind,
    pub message: String,
}

impl InvocationFailure {
    fn new(capability: CapabilityKind, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            capability,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuccessPayload {
    Tool {
        content: Vec<ContentBlock>,
        structured: Option<Value>,
    },
    Resource {
        uri: String,
        mime_type: Option<String>,
        content: Vec<ContentBlock>,
    },
    Prompt {
        description: Option<String>,
        messages: Vec<PromptMessage>,
    },
}

/// Result of one invocation. Built fresh per call and consumed by the
/// envelope builder.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Success(SuccessPayload),
    Failure(InvocationFailure),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success(_))
    }

    pub fn failure(&self) -> Option<&InvocationFailure> {
        match self {
            InvocationOutcome::Failure(f) => Some(f),
            InvocationOutcome::Success(_) => None,
        }
    }

    /// Content blocks of a tool or resource success; empty otherwise.
    pub fn content(&self) -> &[ContentBlock] {
        match self {
            InvocationOutcome::Success(SuccessPayload::Tool { content, .. })
            | InvocationOutcome::Success(SuccessPayload::Resource { content, .. }) => content,
            _ => &[],
        }
    }
}

type Invocation = Result<SuccessPayload, InvocationFailure>;

/// Stateless pipeline over a shared, read-only [`Registry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn invoke(&self, request: InvocationRequest) -> InvocationOutcome {
        let started = Instant::now();
        let kind = request.kind();
        let target = request.target().to_string();
        tracing::debug!("Invoking {kind}/{target}");

        let result = match request {
            InvocationRequest::CallTool { name, arguments } => {
                match self.lookup(CapabilityKind::Tool, &name) {
                    Ok(d) => call_tool(d, arguments.unwrap_or(Value::Null)).await,
                    Err(f) => Err(f),
                }
            }
            InvocationRequest::ReadResource { uri } => match self.registry.resolve_resource(&uri) {
                Some((d, vars)) => read_resource(d, Some(uri), Value::Object(vars)).await,
                None => Err(unknown(CapabilityKind::Resource, &uri)),
            },
            InvocationRequest::GetPrompt { name, arguments } => {
                match self.lookup(CapabilityKind::Prompt, &name) {
                    Ok(d) => get_prompt(d, arguments.unwrap_or(Value::Null)).await,
                    Err(f) => Err(f),
                }
            }
        };

        finish(kind, &target, started, result)
    }

    /// Invoke any capability by kind and name. Resources addressed this way
    /// take their template variables as arguments and are read at the URI
    /// those variables expand to.
    pub async fn invoke_kind(
        &self,
        kind: CapabilityKind,
        name: &str,
        arguments: Option<Value>,
    ) -> InvocationOutcome {
        match kind {
            CapabilityKind::Tool => {
                self.invoke(InvocationRequest::CallTool {
                    name: name.to_string(),
                    arguments,
                })
                .await
            }
            CapabilityKind::Prompt => {
                self.invoke(InvocationRequest::GetPrompt {
                    name: name.to_string(),
                    arguments,
                })
                .await
            }
            CapabilityKind::Resource => {
                let started = Instant::now();
                tracing::debug!("Invoking {kind}/{name}");
                let result = match self.lookup(CapabilityKind::Resource, name) {
                    Ok(d) => read_resource(d, None, arguments.unwrap_or(Value::Null)).await,
                    Err(f) => Err(f),
                };
                finish(kind, name, started, result)
            }
        }
    }

    fn lookup(&self, kind: CapabilityKind, name: &str) -> Result<&Descriptor, InvocationFailure> {
        self.registry
            .lookup(kind, name)
            .map_err(|_| unknown(kind, name))
    }
}

/// Log how the invocation ended and wrap it as an outcome.
fn finish(
    kind: CapabilityKind,
    target: &str,
    started: Instant,
    result: Invocation,
) -> InvocationOutcome {
    let elapsed = started.elapsed();
    match result {
        Ok(payload) => {
            tracing::debug!("{kind}/{target} succeeded in {elapsed:?}");
            InvocationOutcome::Success(payload)
        }
        Err(failure) => {
            tracing::debug!(
                "{kind}/{target} failed ({}) in {elapsed:?}: {}",
                failure.kind,
                failure.message
            );
            InvocationOutcome::Failure(failure)
        }
    }
}

fn unknown(kind: CapabilityKind, name: &str) -> InvocationFailure {
    InvocationFailure::new(
        kind,
        FailureKind::Lookup,
        format!("unknown capability: {kind}/{name}"),
    )
}

fn validate_input(d: &Descriptor, raw: &Value) -> Result<Map<String, Value>, InvocationFailure> {
    match validate(&d.input_schema, raw) {
        ValidationResult::Valid(record) => Ok(record),
        ValidationResult::Invalid(errors) => {
            tracing::warn!("Rejected arguments for {}: {errors}", d.qualified_name());
            Err(InvocationFailure::new(
                d.kind(),
                FailureKind::Validation,
                format!("invalid arguments for {}: {errors}", d.qualified_name()),
            ))
        }
    }
}

async fn call_tool(d: &Descriptor, raw: Value) -> Invocation {
    let args = validate_input(d, &raw)?;
    let Handler::Tool(handler) = d.handler() else {
        return Err(mismatched(d));
    };
    let output = guarded(d, handler.call(args)).await?;

    if let Some(schema) = &d.output_schema {
        let violation = match &output.structured {
            None => Some("no structured content returned".to_string()),
            Some(structured) => match validate(schema, structured) {
                ValidationResult::Valid(_) => None,
                ValidationResult::Invalid(errors) => Some(errors.to_string()),
            },
        };
        if let Some(violation) = violation {
            tracing::error!(
                "Contract bug: {} returned output that violates its schema: {violation}",
                d.qualified_name()
            );
            return Err(InvocationFailure::new(
                CapabilityKind::Tool,
                FailureKind::OutputContract,
                format!(
                    "output contract violated by {}: {violation}",
                    d.qualified_name()
                ),
            ));
        }
    }

    Ok(SuccessPayload::Tool {
        content: output.content,
        structured: output.structured,
    })
}

async fn read_resource(d: &Descriptor, uri: Option<String>, raw: Value) -> Invocation {
    let vars = validate_input(d, &raw)?;
    let (Handler::Resource(handler), Some(locator)) = (d.handler(), d.resource.as_ref()) else {
        return Err(mismatched(d));
    };
    let uri = uri.unwrap_or_else(|| locator.uri.expand(&vars));
    let content = guarded(d, handler.read(&uri, vars)).await?;

    Ok(SuccessPayload::Resource {
        uri,
        mime_type: locator.mime_type.clone(),
        content,
    })
}

async fn get_prompt(d: &Descriptor, raw: Value) -> Invocation {
    let args = validate_input(d, &raw)?;
    let Handler::Prompt(handler) = d.handler() else {
        return Err(mismatched(d));
    };
    let messages = guarded(d, handler.get(args)).await?;

    Ok(SuccessPayload::Prompt {
        description: d.description.clone(),
        messages,
    })
}

/// Await a handler future, converting both its error and any panic into a
/// handler failure.
async fn guarded<T>(
    d: &Descriptor,
    fut: impl Future<Output = HandlerResult<T>>,
) -> Result<T, InvocationFailure> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(InvocationFailure::new(
            d.kind(),
            FailureKind::Handler,
            e.message(),
        )),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!("Handler for {} panicked: {message}", d.qualified_name());
            Err(InvocationFailure::new(
                d.kind(),
                FailureKind::Handler,
                format!("handler panicked: {message}"),
            ))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// Unreachable through the registry: namespaces are keyed by handler kind.
fn mismatched(d: &Descriptor) -> InvocationFailure {
    InvocationFailure::new(
        d.kind(),
        FailureKind::Lookup,
        format!("capability {} cannot serve this request", d.qualified_name()),
    )
}
