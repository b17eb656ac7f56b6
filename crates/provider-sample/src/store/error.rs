/// Errors returned by the entry store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store closed")]
    Closed,
    #[error("Store dropped response channel")]
    Dropped,
    #[error("Key already exists: {0}")]
    AlreadyExists(String),
    #[error("Key not found: {0}")]
    NotFound(String),
}
