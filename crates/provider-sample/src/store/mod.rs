//! # Entry Store
//!
//! An in-process backing system for the `xyz:index:KeyValue` resource, built as
//! an actor: [`StoreActor`] owns the entries and processes requests one at a
//! time from an mpsc channel, and [`StoreClient`] sends requests and awaits the
//! reply on a oneshot channel.
//!
//! Because the actor processes messages sequentially, the map needs no lock even
//! when many provider calls hit the store at once.
//!
//! ```rust
//! use provider_sample::model::EntryWrite;
//! use provider_sample::store;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, client) = store::new();
//!     tokio::spawn(actor.run());
//!
//!     let write = EntryWrite { key: "color".into(), value: "blue".into(), tags: Default::default() };
//!     let entry = client.insert(write).await.unwrap();
//!     assert_eq!(entry.revision, 1);
//!     assert!(client.remove("color").await.unwrap());
//! }
//! ```

pub mod client;
pub mod error;

pub use client::StoreClient;
pub use error::StoreError;

use crate::model::{Entry, EntryWrite};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Default capacity of the request channel.
pub const DEFAULT_BUFFER: usize = 32;

/// One-shot response channel for a store request.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Requests processed by the store actor.
#[derive(Debug)]
pub enum StoreRequest {
    Insert {
        write: EntryWrite,
        respond_to: Response<Entry>,
    },
    Get {
        key: String,
        respond_to: Response<Option<Entry>>,
    },
    Replace {
        write: EntryWrite,
        respond_to: Response<Entry>,
    },
    Remove {
        key: String,
        respond_to: Response<bool>,
    },
}

/// Creates a store actor and its client with the default buffer.
pub fn new() -> (StoreActor, StoreClient) {
    StoreActor::new(DEFAULT_BUFFER)
}

/// The server half of the store. Owns the entries; must be driven by
/// [`StoreActor::run`].
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    entries: HashMap<String, Entry>,
}

impl StoreActor {
    pub fn new(buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            entries: HashMap::new(),
        };
        (actor, StoreClient::new(sender))
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!("Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Insert { write, respond_to } => {
                    let key = write.key.clone();
                    if self.entries.contains_key(&key) {
                        warn!(%key, "Key already exists");
                        let _ = respond_to.send(Err(StoreError::AlreadyExists(key)));
                        continue;
                    }
                    let entry = Entry::new(write);
                    self.entries.insert(key.clone(), entry.clone());
                    info!(%key, size = self.entries.len(), "Inserted");
                    let _ = respond_to.send(Ok(entry));
                }
                StoreRequest::Get { key, respond_to } => {
                    let entry = self.entries.get(&key).cloned();
                    debug!(%key, found = entry.is_some(), "Get");
                    let _ = respond_to.send(Ok(entry));
                }
                StoreRequest::Replace { write, respond_to } => {
                    let key = write.key.clone();
                    match self.entries.get_mut(&key) {
                        Some(entry) => {
                            entry.apply(write);
                            info!(%key, revision = entry.revision, "Replaced");
                            let _ = respond_to.send(Ok(entry.clone()));
                        }
                        None => {
                            warn!(%key, "Not found");
                            let _ = respond_to.send(Err(StoreError::NotFound(key)));
                        }
                    }
                }
                StoreRequest::Remove { key, respond_to } => {
                    let existed = self.entries.remove(&key).is_some();
                    info!(%key, existed, size = self.entries.len(), "Removed");
                    let _ = respond_to.send(Ok(existed));
                }
            }
        }

        info!(size = self.entries.len(), "Shutdown");
    }
}
