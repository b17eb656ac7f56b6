//! # Provider Framework
//!
//! The engine of a resource lifecycle provider: the component an
//! infrastructure-orchestration engine calls to validate, diff, create, read,
//! update and delete externally hosted resources.
//!
//! A provider serves a catalog of resource types. Each type is a
//! [`ResourceDefinition`]: a [`ResourceSchema`], an [`IdentityPolicy`], and up to
//! one implementation of each lifecycle operation. Definitions are collected in
//! an immutable [`Registry`], and a [`Provider`] dispatches calls against it.
//!
//! ## Architecture Overview
//!
//! 1. **Value layer** ([`PropertyValue`], [`marshal`]) - typed property bags that
//!    can carry *unknown* and *secret* markers, with one total conversion to and
//!    from the plain `serde_json` data implementations work with.
//! 2. **Definition layer** ([`ResourceDefinition`], [`Registry`]) - what each type
//!    looks like and which operations it supports, validated at registration.
//! 3. **Decision layer** ([`check()`], [`diff()`]) - pure functions deciding whether
//!    inputs are acceptable and whether a change is an update or a replacement.
//! 4. **Dispatch layer** ([`Provider`]) - async entry points that route calls to
//!    implementations under tracing spans, cancellation and deadlines.
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use provider_framework::{
//!     CreateOperation, OperationContext, OperationError, PlainMap, PropertyMap, PropertySpec,
//!     PropertyValue, Provider, ProviderOptions, Registry, ResourceDefinition, ResourceSchema,
//! };
//! use serde_json::Value;
//! use std::sync::Arc;
//!
//! struct Greeting;
//!
//! #[async_trait]
//! impl CreateOperation for Greeting {
//!     async fn create(&self, _ctx: &OperationContext, mut inputs: PlainMap) -> Result<PlainMap, OperationError> {
//!         let name = inputs.get("name").and_then(Value::as_str).ok_or("name is required")?;
//!         let text = format!("hello, {name}");
//!         inputs.insert("text".into(), Value::String(text));
//!         Ok(inputs)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let schema = ResourceSchema::new("A greeting.")
//!         .with_required_input("name", PropertySpec::string("Who to greet."))
//!         .with_required_output("name", PropertySpec::string("Who to greet."))
//!         .with_required_output("text", PropertySpec::string("The greeting."));
//!
//!     let registry = Registry::builder()
//!         .register(
//!             ResourceDefinition::new("demo:index:Greeting", schema)
//!                 .with_identity(["name"])
//!                 .with_create(Greeting),
//!         )
//!         .expect("valid definition")
//!         .build();
//!
//!     let provider = Provider::new(Arc::new(registry), ProviderOptions::new("demo", "0.1.0"));
//!
//!     let inputs = PropertyMap::from([("name".to_string(), PropertyValue::from("world"))]);
//!     let checked = provider.check("demo:index:Greeting", &PropertyMap::new(), inputs).unwrap();
//!     assert!(checked.is_valid());
//!
//!     let created = provider.create("demo:index:Greeting", checked.inputs).await.unwrap();
//!     assert_eq!(created.id, "world");
//!     assert_eq!(created.properties["text"], PropertyValue::from("hello, world"));
//! }
//! ```
//!
//! ## Testing
//!
//! See [`mock`] for scripted operation implementations that let tests drive the
//! dispatcher without a backing system.

pub mod cancel;
pub mod check;
pub mod config;
pub mod diff;
pub mod error;
pub mod marshal;
pub mod mock;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod schema;
pub mod tracing;
pub mod urn;
pub mod value;

// Re-exports for convenience
pub use cancel::{CancelSignal, CancelSource};
pub use check::{check, CheckFailure, CheckResult, FailureKind};
pub use config::ProviderOptions;
pub use diff::{diff, DiffResult, PropertyDiffKind};
pub use error::{ConfigError, ProviderError, RegistryError};
pub use marshal::{from_plain, to_plain, MarshalOptions, PlainMap};
pub use provider::{CreateResult, Phase, PluginInfo, Provider, ReadResult, UpdateResult};
pub use registry::{Registry, RegistryBuilder};
pub use resource::{
    Capabilities, CreateOperation, DeleteOperation, IdentityPolicy, Operation, OperationContext,
    OperationError, ReadOperation, ResourceDefinition, UpdateOperation,
};
pub use schema::{PackageSpec, PropertySpec, ResourceSchema, ResourceSpec, TypeSpec};
pub use value::{PropertyMap, PropertyValue};
