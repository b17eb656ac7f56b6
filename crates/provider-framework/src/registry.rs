//! # Resource Registry
//!
//! The catalog of resource types a provider serves. Built once through
//! [`RegistryBuilder`], which rejects malformed definitions up front, and
//! immutable afterwards: lookups are plain map reads and need no locking, so a
//! single `Arc<Registry>` can back any number of concurrent calls.

use crate::error::{ProviderError, RegistryError};
use crate::resource::ResourceDefinition;
use crate::schema::PackageSpec;
use crate::urn;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Registry {
    definitions: BTreeMap<String, ResourceDefinition>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn lookup(&self, token: &str) -> Result<&ResourceDefinition, ProviderError> {
        self.definitions
            .get(token)
            .ok_or_else(|| ProviderError::UnknownResourceType(token.to_string()))
    }

    /// Registered type tokens, in sorted order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Exports the schema of every registered type as one package document.
    pub fn package_spec(&self, name: &str, version: &str) -> PackageSpec {
        PackageSpec {
            name: name.to_string(),
            version: version.to_string(),
            resources: self
                .definitions
                .iter()
                .map(|(token, def)| (token.clone(), def.schema().to_resource_spec()))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: BTreeMap<String, ResourceDefinition>,
}

impl RegistryBuilder {
    /// Adds a definition after checking it is internally consistent.
    pub fn register(mut self, definition: ResourceDefinition) -> Result<Self, RegistryError> {
        validate(&definition)?;
        let token = definition.token().to_string();
        if self.definitions.contains_key(&token) {
            return Err(RegistryError::DuplicateToken(token));
        }
        debug!(%token, capabilities = %definition.capabilities(), "Registered resource type");
        self.definitions.insert(token, definition);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            definitions: self.definitions,
        }
    }
}

fn validate(definition: &ResourceDefinition) -> Result<(), RegistryError> {
    let token = definition.token();
    let invalid = |reason: String| RegistryError::InvalidDefinition {
        token: token.to_string(),
        reason,
    };

    if !urn::is_valid_token(token) {
        return Err(invalid("token must have the form pkg:module:Type".into()));
    }

    let schema = definition.schema();
    for name in &schema.required_inputs {
        if !schema.inputs.contains_key(name) {
            return Err(invalid(format!("required input `{name}` is not a declared input")));
        }
        if !schema.outputs.contains_key(name) {
            return Err(invalid(format!("required input `{name}` is missing from the outputs")));
        }
    }
    for name in &schema.required_outputs {
        if !schema.outputs.contains_key(name) {
            return Err(invalid(format!("required output `{name}` is not a declared output")));
        }
    }
    for name in &schema.replace_on_changes {
        if !schema.inputs.contains_key(name) {
            return Err(invalid(format!("replace-on-change `{name}` is not a declared input")));
        }
    }
    for name in definition.identity().properties() {
        if !schema.outputs.contains_key(name) {
            return Err(invalid(format!("identity property `{name}` is not a declared output")));
        }
    }
    if definition.capabilities().create && definition.identity().is_empty() {
        return Err(invalid("a creatable type needs at least one identity property".into()));
    }
    Ok(())
}
