//! Toolbelt — schema-validated capability registry and dispatcher for MCP servers.
//!
//! Capabilities (tools, resources, prompts) are registered once as
//! [`Descriptor`]s. The [`Dispatcher`] validates caller arguments against each
//! descriptor's schema, runs the handler, and normalizes every result or
//! failure into an [`InvocationOutcome`], which [`envelope::build`] turns into
//! the protocol response.

pub mod content;
pub mod descriptor;
pub mod dispatch;
pub mod envelope;
pub mod registry;
pub mod schema;
pub mod uri_template;
pub mod validate;

pub use content::{ContentBlock, PromptMessage, Role};
pub use descriptor::{
    Arguments, CapabilityKind, Descriptor, Handler, HandlerError, HandlerResult, PromptFn,
    PromptHandler, ResourceFn, ResourceHandler, ToolFn, ToolHandler, ToolOutput,
};
pub use dispatch::{
    Dispatcher, FailureKind, InvocationFailure, InvocationOutcome, InvocationRequest,
    SuccessPayload,
};
pub use envelope::{build as build_envelope, Envelope};
pub use registry::{Registry, RegistryError};
pub use schema::{FieldSpec, FieldType, ObjectSchema, UnknownFields};
pub use uri_template::UriTemplate;
pub use validate::{validate, FieldError, ValidationErrors, ValidationResult};
