//! Capability registry — one append-only namespace per capability kind.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::descriptor::{CapabilityKind, Descriptor};
use crate::uri_template::UriTemplateError;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate capability: {kind}/{name}")]
    Duplicate { kind: CapabilityKind, name: String },

    #[error("Unknown capability: {kind}/{name}")]
    NotFound { kind: CapabilityKind, name: String },

    #[error("Output schema is only supported on tools: {kind}/{name}")]
    UnexpectedOutputSchema { kind: CapabilityKind, name: String },

    #[error("Invalid resource URI: {0}")]
    InvalidTemplate(#[from] UriTemplateError),
}

#[derive(Default)]
struct Namespace {
    entries: Vec<Descriptor>,
    index: HashMap<String, usize>,
}

impl Namespace {
    fn insert(&mut self, descriptor: Descriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate {
                kind: descriptor.kind(),
                name: descriptor.name,
            });
        }
        self.index.insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(descriptor);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<&Descriptor> {
        self.index.get(name).map(|&i| &self.entries[i])
    }
}

/// All registered capabilities. Built once at startup, then shared read-only.
#[derive(Default)]
pub struct Registry {
    tools: Namespace,
    resources: Namespace,
    prompts: Namespace,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, kind: CapabilityKind) -> &Namespace {
        match kind {
            CapabilityKind::Tool => &self.tools,
            CapabilityKind::Resource => &self.resources,
            CapabilityKind::Prompt => &self.prompts,
        }
    }

    fn namespace_mut(&mut self, kind: CapabilityKind) -> &mut Namespace {
        match kind {
            CapabilityKind::Tool => &mut self.tools,
            CapabilityKind::Resource => &mut self.resources,
            CapabilityKind::Prompt => &mut self.prompts,
        }
    }

    /// Register a descriptor. The first registration of a `(kind, name)`
    /// pair wins; later ones fail and leave the registry unchanged.
    pub fn register(&mut self, descriptor: Descriptor) -> Result<(), RegistryError> {
        let kind = descriptor.kind();
        if kind != CapabilityKind::Tool && descriptor.output_schema.is_some() {
            return Err(RegistryError::UnexpectedOutputSchema {
                kind,
                name: descriptor.name,
            });
        }
        let name = descriptor.name.clone();
        self.namespace_mut(kind).insert(descriptor)?;
        tracing::debug!("Registered {kind}/{name}");
        Ok(())
    }

    pub fn lookup(&self, kind: CapabilityKind, name: &str) -> Result<&Descriptor, RegistryError> {
        self.namespace(kind)
            .get(name)
            .ok_or_else(|| RegistryError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Descriptors of one kind, in registration order.
    pub fn list(&self, kind: CapabilityKind) -> &[Descriptor] {
        &self.namespace(kind).entries
    }

    pub fn len(&self, kind: CapabilityKind) -> usize {
        self.namespace(kind).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        CapabilityKind::ALL.iter().all(|&k| self.len(k) == 0)
    }

    /// Find the resource addressed by `uri`.
    ///
    /// Fixed URIs are tried before templates; within each group the earliest
    /// registration wins. Returns the descriptor and the extracted variables.
    pub fn resolve_resource(&self, uri: &str) -> Option<(&Descriptor, Map<String, Value>)> {
        let entries = &self.resources.entries;
        let located = |d: &Descriptor, want_template: bool| {
            d.resource
                .as_ref()
                .filter(|loc| loc.uri.is_template() == want_template)
                .and_then(|loc| loc.uri.matches(uri))
        };

        entries
            .iter()
            .find_map(|d| located(d, false).map(|vars| (d, vars)))
            .or_else(|| {
                entries
                    .iter()
                    .find_map(|d| located(d, true).map(|vars| (d, vars)))
            })
    }
}
