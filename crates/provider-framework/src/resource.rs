//! # Resource Definitions
//!
//! A [`ResourceDefinition`] binds a type token to its schema, its identity policy,
//! and up to one implementation of each lifecycle operation.
//!
//! Implementations are opaque async functions over plain structured data
//! ([`PlainMap`]). Each operation is its own trait so that a definition states
//! exactly which operations it supports, and the dispatcher matches on presence:
//!
//! | Missing    | Meaning                                                  |
//! |------------|----------------------------------------------------------|
//! | `Create`   | the type can be neither checked nor created              |
//! | `Read`     | the resource is assumed to exist with its last state     |
//! | `Update`   | every input change requires replacement                  |
//! | `Delete`   | removing the resource needs no cleanup                   |
//!
//! ```rust
//! use async_trait::async_trait;
//! use provider_framework::{
//!     CreateOperation, OperationContext, OperationError, PlainMap, PropertySpec,
//!     ResourceDefinition, ResourceSchema,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl CreateOperation for Echo {
//!     async fn create(&self, _ctx: &OperationContext, inputs: PlainMap) -> Result<PlainMap, OperationError> {
//!         Ok(inputs)
//!     }
//! }
//!
//! let schema = ResourceSchema::new("Echoes its name.")
//!     .with_required_input("name", PropertySpec::string("Name."))
//!     .with_required_output("name", PropertySpec::string("Name."));
//!
//! let definition = ResourceDefinition::new("demo:index:Echo", schema)
//!     .with_identity(["name"])
//!     .with_create(Echo);
//! assert!(definition.capabilities().create);
//! assert!(!definition.capabilities().update);
//! ```

use crate::cancel::CancelSignal;
use crate::marshal::PlainMap;
use crate::schema::ResourceSchema;
use crate::value::PropertyMap;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Error type returned by resource implementations.
pub type OperationError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle operations, as named in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Check,
    Diff,
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Check => "check",
            Operation::Diff => "diff",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an implementation knows about the call it is serving.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub token: String,
    /// Identity of the target resource; `None` during Create.
    pub id: Option<String>,
    cancel: CancelSignal,
}

impl OperationContext {
    pub fn new(token: impl Into<String>, id: Option<String>, cancel: CancelSignal) -> Self {
        Self {
            token: token.into(),
            id,
            cancel,
        }
    }

    /// Whether the provider has been cancelled. Long-running implementations
    /// may poll this to stop early.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the provider is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

#[async_trait]
pub trait CreateOperation: Send + Sync {
    /// Creates the resource and returns its outputs.
    async fn create(&self, ctx: &OperationContext, inputs: PlainMap)
        -> Result<PlainMap, OperationError>;
}

#[async_trait]
pub trait ReadOperation: Send + Sync {
    /// Returns the current outputs, or `None` if the resource no longer exists.
    async fn read(
        &self,
        ctx: &OperationContext,
        id: &str,
        state: PlainMap,
    ) -> Result<Option<PlainMap>, OperationError>;
}

#[async_trait]
pub trait UpdateOperation: Send + Sync {
    /// Applies `news` in place and returns the new outputs.
    async fn update(
        &self,
        ctx: &OperationContext,
        id: &str,
        olds: PlainMap,
        news: PlainMap,
    ) -> Result<PlainMap, OperationError>;
}

#[async_trait]
pub trait DeleteOperation: Send + Sync {
    /// Removes the resource. On error the resource is still present.
    async fn delete(
        &self,
        ctx: &OperationContext,
        id: &str,
        state: PlainMap,
    ) -> Result<(), OperationError>;
}

/// Which operations a definition implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.create, "create"),
            (self.read, "read"),
            (self.update, "update"),
            (self.delete, "delete"),
        ]
        .into_iter()
        .filter_map(|(present, name)| present.then_some(name))
        .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}

/// Output properties whose values, joined with `:`, form a resource's identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityPolicy {
    properties: Vec<String>,
}

impl IdentityPolicy {
    pub const SEPARATOR: &'static str = ":";

    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Derives the identity from a resource's outputs.
    ///
    /// Fails with the names of the properties that are absent or have no
    /// identity rendering (see [`PropertyValue::identity_fragment`]).
    ///
    /// [`PropertyValue::identity_fragment`]: crate::PropertyValue::identity_fragment
    pub fn derive(&self, outputs: &PropertyMap) -> Result<String, Vec<String>> {
        let mut fragments = Vec::with_capacity(self.properties.len());
        let mut missing = Vec::new();
        for name in &self.properties {
            match outputs.get(name).and_then(|v| v.identity_fragment()) {
                Some(fragment) => fragments.push(fragment),
                None => missing.push(name.clone()),
            }
        }
        if fragments.is_empty() || !missing.is_empty() {
            return Err(missing);
        }
        Ok(fragments.join(Self::SEPARATOR))
    }
}

/// A registered resource type.
#[derive(Clone)]
pub struct ResourceDefinition {
    token: String,
    schema: ResourceSchema,
    identity: IdentityPolicy,
    create: Option<Arc<dyn CreateOperation>>,
    read: Option<Arc<dyn ReadOperation>>,
    update: Option<Arc<dyn UpdateOperation>>,
    delete: Option<Arc<dyn DeleteOperation>>,
}

impl ResourceDefinition {
    pub fn new(token: impl Into<String>, schema: ResourceSchema) -> Self {
        Self {
            token: token.into(),
            schema,
            identity: IdentityPolicy::default(),
            create: None,
            read: None,
            update: None,
            delete: None,
        }
    }

    pub fn with_identity<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity = IdentityPolicy::new(properties);
        self
    }

    pub fn with_create(mut self, op: impl CreateOperation + 'static) -> Self {
        self.create = Some(Arc::new(op));
        self
    }

    pub fn with_read(mut self, op: impl ReadOperation + 'static) -> Self {
        self.read = Some(Arc::new(op));
        self
    }

    pub fn with_update(mut self, op: impl UpdateOperation + 'static) -> Self {
        self.update = Some(Arc::new(op));
        self
    }

    pub fn with_delete(mut self, op: impl DeleteOperation + 'static) -> Self {
        self.delete = Some(Arc::new(op));
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    pub fn identity(&self) -> &IdentityPolicy {
        &self.identity
    }

    pub fn create_operation(&self) -> Option<&Arc<dyn CreateOperation>> {
        self.create.as_ref()
    }

    pub fn read_operation(&self) -> Option<&Arc<dyn ReadOperation>> {
        self.read.as_ref()
    }

    pub fn update_operation(&self) -> Option<&Arc<dyn UpdateOperation>> {
        self.update.as_ref()
    }

    pub fn delete_operation(&self) -> Option<&Arc<dyn DeleteOperation>> {
        self.delete.as_ref()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            create: self.create.is_some(),
            read: self.read.is_some(),
            update: self.update.is_some(),
            delete: self.delete.is_some(),
        }
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("token", &self.token)
            .field("identity", &self.identity)
            .field("capabilities", &self.capabilities().to_string())
            .finish_non_exhaustive()
    }
}
