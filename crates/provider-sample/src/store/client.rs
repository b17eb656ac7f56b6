//! # Store Client
//!
//! The cloneable handle used to talk to a running [`StoreActor`](super::StoreActor).

use super::{StoreError, StoreRequest};
use crate::model::{Entry, EntryWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// Async API over the store actor's channel. Holds only a sender, so clones are
/// cheap and the actor stops once every clone is dropped.
#[derive(Debug, Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    /// Inserts a new entry. Fails if the key is taken.
    #[instrument(skip(self, write), fields(key = %write.key))]
    pub async fn insert(&self, write: EntryWrite) -> Result<Entry, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Insert { write, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<Entry>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get {
                key: key.to_string(),
                respond_to,
            })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    /// Overwrites an existing entry. Fails if the key is absent.
    #[instrument(skip(self, write), fields(key = %write.key))]
    pub async fn replace(&self, write: EntryWrite) -> Result<Entry, StoreError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Replace { write, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    /// Removes an entry, returning whether it was present.
    #[instrument(skip(self))]
    pub async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Remove {
                key: key.to_string(),
                respond_to,
            })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }
}
