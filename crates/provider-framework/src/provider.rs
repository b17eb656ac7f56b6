//! # Lifecycle Dispatcher
//!
//! [`Provider`] is the entry point the orchestration engine calls. Each call
//! resolves its resource type through the shared [`Registry`], runs validation or
//! diffing locally, and dispatches Create/Read/Update/Delete to the registered
//! implementation, converting property bags to plain data on the way in and back
//! on the way out.
//!
//! Calls keep no state between them. Within a call the dispatcher moves through
//! a fixed sequence of [`Phase`]s, logged at `debug` level inside a span that
//! carries the `token`, `operation` and `id` of the call.
//!
//! ## Cancellation and deadlines
//!
//! Every implementation call races against the provider-wide cancel signal
//! ([`Provider::cancel`]) and, when configured, against
//! [`ProviderOptions::operation_timeout`]. Losing the race yields
//! [`ProviderError::Cancelled`] or [`ProviderError::TimedOut`]; the side effect
//! may or may not have happened. Dropping the future returned by a call cancels
//! that call alone, with the same caveat.

use crate::cancel::CancelSource;
use crate::check::{self, CheckResult};
use crate::config::ProviderOptions;
use crate::diff::{self, DiffResult};
use crate::error::ProviderError;
use crate::marshal::{self, MarshalOptions};
use crate::registry::Registry;
use crate::resource::{Operation, OperationContext, OperationError, ResourceDefinition};
use crate::urn;
use crate::value::{PropertyMap, PropertyValue};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn, Span};

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The call has arrived; its type is not resolved yet.
    Unvalidated,
    /// The type is registered and supports the requested operation.
    Validated,
    Creating,
    Reading,
    Updating,
    Deleting,
    /// The call has a result, successful or not.
    Settled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Unvalidated => "unvalidated",
            Phase::Validated => "validated",
            Phase::Creating => "creating",
            Phase::Reading => "reading",
            Phase::Updating => "updating",
            Phase::Deleting => "deleting",
            Phase::Settled => "settled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateResult {
    pub id: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    /// Empty when the resource no longer exists.
    pub id: String,
    pub properties: PropertyMap,
    pub inputs: PropertyMap,
    pub exists: bool,
}

impl ReadResult {
    fn gone() -> Self {
        Self {
            id: String::new(),
            properties: PropertyMap::new(),
            inputs: PropertyMap::new(),
            exists: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub version: String,
}

/// The lifecycle dispatcher. Cheap to share behind an `Arc`; every method takes
/// `&self` and calls may run concurrently.
#[derive(Debug)]
pub struct Provider {
    registry: Arc<Registry>,
    options: ProviderOptions,
    cancel: CancelSource,
}

impl Provider {
    pub fn new(registry: Arc<Registry>, options: ProviderOptions) -> Self {
        info!(
            name = %options.name,
            version = %options.version,
            resource_types = registry.len(),
            "Provider ready"
        );
        Self {
            registry,
            options,
            cancel: CancelSource::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    // --- Configuration lifecycle -------------------------------------------

    /// Provider configuration carries no schema: inputs are accepted as given.
    pub fn check_config(&self, config: PropertyMap) -> CheckResult {
        debug!(keys = config.len(), "CheckConfig");
        CheckResult {
            inputs: config,
            failures: Vec::new(),
        }
    }

    /// Configuration changes never require replacing the provider.
    pub fn diff_config(&self, _olds: &PropertyMap, _news: &PropertyMap) -> DiffResult {
        DiffResult::default()
    }

    pub fn configure(&self, config: &PropertyMap) -> Result<(), ProviderError> {
        info!(keys = config.len(), "Configured");
        Ok(())
    }

    // --- Resource lifecycle -------------------------------------------------

    #[instrument(skip_all, fields(token = urn::type_token(type_or_urn), operation = "check"))]
    pub fn check(
        &self,
        type_or_urn: &str,
        _olds: &PropertyMap,
        news: PropertyMap,
    ) -> Result<CheckResult, ProviderError> {
        let definition = self.resolve(type_or_urn)?;
        let result = check::check(definition, &news)?;
        if result.is_valid() {
            debug!(inputs = ?result.inputs, "Inputs accepted");
        } else {
            let failures: Vec<String> = result.failures.iter().map(ToString::to_string).collect();
            info!(?failures, "Inputs rejected");
        }
        Ok(result)
    }

    #[instrument(skip_all, fields(token = urn::type_token(type_or_urn), operation = "diff", id = %id))]
    pub fn diff(
        &self,
        type_or_urn: &str,
        id: &str,
        olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<DiffResult, ProviderError> {
        let definition = self.resolve(type_or_urn)?;
        let result = diff::diff(definition, olds, news);
        debug!(
            changes = result.changes,
            replace = ?result.replace_properties,
            delete_before_replace = result.delete_before_replace,
            "Diffed"
        );
        Ok(result)
    }

    /// Creates a resource. Each call performs exactly one Create; identical
    /// requests are not de-duplicated.
    #[instrument(skip_all, fields(token = urn::type_token(type_or_urn), operation = "create", id = tracing::field::Empty))]
    pub async fn create(
        &self,
        type_or_urn: &str,
        inputs: PropertyMap,
    ) -> Result<CreateResult, ProviderError> {
        let definition = self.resolve(type_or_urn)?;
        let Some(op) = definition.create_operation() else {
            return Err(ProviderError::UnsupportedResourceType {
                token: definition.token().to_string(),
            });
        };
        enter(Phase::Validated);

        let plain = marshal::to_plain(&inputs, MarshalOptions::implementation());
        let ctx = self.context(definition, None);
        enter(Phase::Creating);
        let outputs = self
            .guard(definition, Operation::Create, None, op.create(&ctx, plain))
            .await;
        enter(Phase::Settled);

        let properties = rewrap_secrets(definition, &[&inputs], marshal::from_plain(&outputs?));
        let id = definition.identity().derive(&properties).map_err(|missing| {
            warn!(?missing, "Created resource has no identity");
            ProviderError::IdentityUnavailable {
                token: definition.token().to_string(),
                missing,
            }
        })?;

        Span::current().record("id", id.as_str());
        info!(%id, "Created");
        Ok(CreateResult { id, properties })
    }

    /// Refreshes a resource's state. Without a Read operation the recorded
    /// state is returned unchanged.
    #[instrument(skip_all, fields(token = urn::type_token(type_or_urn), operation = "read", id = %id))]
    pub async fn read(
        &self,
        type_or_urn: &str,
        id: &str,
        state: PropertyMap,
        inputs: PropertyMap,
    ) -> Result<ReadResult, ProviderError> {
        let definition = self.resolve(type_or_urn)?;
        let Some(op) = definition.read_operation() else {
            debug!("No read operation; returning recorded state");
            return Ok(ReadResult {
                id: id.to_string(),
                properties: state,
                inputs,
                exists: true,
            });
        };
        enter(Phase::Validated);

        let plain = marshal::to_plain(&state, MarshalOptions::implementation());
        let ctx = self.context(definition, Some(id));
        enter(Phase::Reading);
        let outputs = self
            .guard(definition, Operation::Read, Some(id), op.read(&ctx, id, plain))
            .await;
        enter(Phase::Settled);

        match outputs? {
            Some(outputs) => {
                let properties =
                    rewrap_secrets(definition, &[&inputs, &state], marshal::from_plain(&outputs));
                debug!("Read");
                Ok(ReadResult {
                    id: id.to_string(),
                    properties,
                    inputs,
                    exists: true,
                })
            }
            None => {
                info!("Resource no longer exists");
                Ok(ReadResult::gone())
            }
        }
    }

    /// Updates a resource in place.
    ///
    /// Calling this for a type without an Update operation is a contract
    /// violation by the caller, since [`Provider::diff`] reports every change to
    /// such a type as a replacement. It fails with
    /// [`ProviderError::UnsupportedOperation`] and touches nothing.
    #[instrument(skip_all, fields(token = urn::type_token(type_or_urn), operation = "update", id = %id))]
    pub async fn update(
        &self,
        type_or_urn: &str,
        id: &str,
        olds: PropertyMap,
        news: PropertyMap,
    ) -> Result<UpdateResult, ProviderError> {
        let definition = self.resolve(type_or_urn)?;
        let Some(op) = definition.update_operation() else {
            warn!("Update requested for a type that can only be replaced");
            return Err(ProviderError::UnsupportedOperation {
                token: definition.token().to_string(),
                operation: Operation::Update,
            });
        };
        enter(Phase::Validated);

        let plain_olds = marshal::to_plain(&olds, MarshalOptions::implementation());
        let plain_news = marshal::to_plain(&news, MarshalOptions::implementation());
        let ctx = self.context(definition, Some(id));
        enter(Phase::Updating);
        let outputs = self
            .guard(
                definition,
                Operation::Update,
                Some(id),
                op.update(&ctx, id, plain_olds, plain_news),
            )
            .await;
        enter(Phase::Settled);

        let properties = rewrap_secrets(definition, &[&news], marshal::from_plain(&outputs?));
        info!("Updated");
        Ok(UpdateResult { properties })
    }

    /// Deletes a resource. Without a Delete operation this succeeds without
    /// doing anything. On error the resource must be assumed still present.
    #[instrument(skip_all, fields(token = urn::type_token(type_or_urn), operation = "delete", id = %id))]
    pub async fn delete(
        &self,
        type_or_urn: &str,
        id: &str,
        state: PropertyMap,
    ) -> Result<(), ProviderError> {
        let definition = self.resolve(type_or_urn)?;
        let Some(op) = definition.delete_operation() else {
            debug!("No delete operation; nothing to clean up");
            return Ok(());
        };
        enter(Phase::Validated);

        let plain = marshal::to_plain(&state, MarshalOptions::implementation());
        let ctx = self.context(definition, Some(id));
        enter(Phase::Deleting);
        let result = self
            .guard(definition, Operation::Delete, Some(id), op.delete(&ctx, id, plain))
            .await;
        enter(Phase::Settled);

        result?;
        info!("Deleted");
        Ok(())
    }

    // --- Provider surface ---------------------------------------------------

    pub fn get_plugin_info(&self) -> PluginInfo {
        PluginInfo {
            version: self.options.version.clone(),
        }
    }

    /// The exported package schema, as pretty-printed JSON.
    pub fn get_schema(&self) -> Result<String, ProviderError> {
        let spec = self
            .registry
            .package_spec(&self.options.name, &self.options.version);
        Ok(serde_json::to_string_pretty(&spec)?)
    }

    /// Trips the provider-wide cancel signal. Every in-flight and future
    /// operation call fails with [`ProviderError::Cancelled`].
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            warn!("Provider cancelled");
        }
        self.cancel.cancel();
    }

    pub async fn invoke(&self, _token: &str, _args: PropertyMap) -> Result<PropertyMap, ProviderError> {
        Err(ProviderError::Unimplemented("Invoke"))
    }

    pub async fn stream_invoke(
        &self,
        _token: &str,
        _args: PropertyMap,
    ) -> Result<Vec<PropertyMap>, ProviderError> {
        Err(ProviderError::Unimplemented("StreamInvoke"))
    }

    pub async fn construct(
        &self,
        _type_or_urn: &str,
        _inputs: PropertyMap,
    ) -> Result<PropertyMap, ProviderError> {
        Err(ProviderError::Unimplemented("Construct"))
    }

    // --- Internals ----------------------------------------------------------

    fn resolve(&self, type_or_urn: &str) -> Result<&ResourceDefinition, ProviderError> {
        enter(Phase::Unvalidated);
        self.registry.lookup(urn::type_token(type_or_urn)).inspect_err(|_| {
            warn!("Unknown resource type");
        })
    }

    fn context(&self, definition: &ResourceDefinition, id: Option<&str>) -> OperationContext {
        OperationContext::new(definition.token(), id.map(str::to_string), self.cancel.signal())
    }

    /// Runs an implementation call against the cancel signal and the optional
    /// deadline, attaching call context to whatever error comes out.
    async fn guard<T, F>(
        &self,
        definition: &ResourceDefinition,
        operation: Operation,
        id: Option<&str>,
        call: F,
    ) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, OperationError>>,
    {
        let token = definition.token().to_string();
        let signal = self.cancel.signal();
        if signal.is_cancelled() {
            return Err(ProviderError::Cancelled { token, operation });
        }

        let timeout = self.options.operation_timeout;
        let bounded = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| limit),
                None => Ok(call.await),
            }
        };

        tokio::select! {
            outcome = bounded => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => {
                    warn!(error = %source, "Operation failed");
                    Err(ProviderError::Operation {
                        token,
                        operation,
                        id: id.map(str::to_string),
                        source,
                    })
                }
                Err(after) => {
                    warn!(?after, "Operation timed out; outcome unknown");
                    Err(ProviderError::TimedOut { token, operation, after })
                }
            },
            _ = signal.cancelled() => {
                warn!("Operation cancelled; outcome unknown");
                Err(ProviderError::Cancelled { token, operation })
            }
        }
    }
}

fn enter(phase: Phase) {
    debug!(%phase, "Phase");
}

/// Re-applies secret tags lost in the plain-data round trip. An output the
/// schema marks secret is wrapped whole. Otherwise the first of `sources`
/// holding a same-named value lends its secret positions, nested ones included.
fn rewrap_secrets(
    definition: &ResourceDefinition,
    sources: &[&PropertyMap],
    outputs: PropertyMap,
) -> PropertyMap {
    outputs
        .into_iter()
        .map(|(name, value)| {
            let value = if value.is_null() {
                value
            } else if definition.schema().is_secret(&name) {
                PropertyValue::secret(value)
            } else {
                match sources.iter().find_map(|bag| bag.get(&name).filter(|v| !v.is_null())) {
                    Some(source) => value.with_secrets_from(source),
                    None => value,
                }
            };
            (name, value)
        })
        .collect()
}
