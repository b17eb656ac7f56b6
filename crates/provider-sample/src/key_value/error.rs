use crate::store::StoreError;

/// Errors raised by the KeyValue resource implementation.
#[derive(Debug, thiserror::Error)]
pub enum KeyValueError {
    #[error("Invalid inputs: {0}")]
    InvalidInputs(#[from] serde_json::Error),
    #[error("Key {key} does not match resource id {id}")]
    KeyMismatch { key: String, id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}
