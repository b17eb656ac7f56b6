//! # System Lifecycle
//!
//! [`SampleSystem`] starts the sample backing systems, builds the registry on
//! top of them, and hands out the resulting [`Provider`]. It also owns the
//! background tasks, so it is the one place that knows how to stop them.
//!
//! ## Graceful Shutdown
//!
//! 1. **Cancel the provider** - in-flight operations end with `Cancelled`
//! 2. **Drop the provider** - the registry, and with it every store client, goes away
//! 3. **Store detects closure** - `receiver.recv()` returns `None`
//! 4. **Await completion** - wait for the store task to finish
//!
//! Shutdown refuses to proceed while other clones of the provider are alive,
//! since those would keep the store's channel open. The refusal hands the
//! system back so shutdown can be retried once those clones are gone.

use crate::store::{self, StoreClient};
use provider_framework::{Provider, ProviderOptions, RegistryError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Provider still has {owners} other owners")]
    ProviderInUse {
        owners: usize,
        system: Box<SampleSystem>,
    },
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// A running provider together with the sample backing systems it serves.
#[derive(Debug)]
pub struct SampleSystem {
    pub provider: Arc<Provider>,
    handles: Vec<JoinHandle<()>>,
}

impl SampleSystem {
    /// Starts the store actor and builds a provider over the sample registry.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(options: ProviderOptions) -> Result<Self, SystemError> {
        let (store_actor, store_client) = store::new();
        let store_handle = tokio::spawn(store_actor.run());

        let registry = crate::registry(store_client)?;
        let provider = Arc::new(Provider::new(Arc::new(registry), options));

        Ok(Self {
            provider,
            handles: vec![store_handle],
        })
    }

    /// Starts a system around an existing store, for callers that need direct
    /// access to the backing data.
    pub fn with_store(options: ProviderOptions, store: StoreClient) -> Result<Self, SystemError> {
        let registry = crate::registry(store)?;
        Ok(Self {
            provider: Arc::new(Provider::new(Arc::new(registry), options)),
            handles: Vec::new(),
        })
    }

    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        let owners = Arc::strong_count(&self.provider) - 1;
        if owners > 0 {
            warn!(owners, "Provider still shared; shutdown refused");
            return Err(SystemError::ProviderInUse {
                owners,
                system: Box::new(self),
            });
        }
        self.provider.cancel();
        drop(self.provider);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Background task failed");
                return Err(SystemError::TaskFailed(e.to_string()));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
