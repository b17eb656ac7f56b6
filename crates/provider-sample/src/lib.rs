//! # Sample Resources
//!
//! Resource implementations for the `xyz` package, and the registry that serves
//! them.
//!
//! - **[random_string]**: `xyz:index:RandomString`, a create-only resource.
//! - **[key_value]**: `xyz:index:KeyValue`, a full-CRUD resource backed by the
//!   actor-based [store].
//! - **[lifecycle]**: [`SampleSystem`](lifecycle::SampleSystem), which starts the
//!   store, builds the registry and owns shutdown.

pub mod key_value;
pub mod lifecycle;
pub mod model;
pub mod random_string;
pub mod store;

use provider_framework::{Registry, RegistryError};
use store::StoreClient;

/// Package name used in schema export.
pub const PACKAGE: &str = "xyz";

/// Builds the registry of every sample resource type.
pub fn registry(store: StoreClient) -> Result<Registry, RegistryError> {
    Ok(Registry::builder()
        .register(random_string::definition())?
        .register(key_value::definition(store))?
        .build())
}
