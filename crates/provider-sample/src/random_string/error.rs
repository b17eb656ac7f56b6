/// Errors raised while creating a random string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RandomStringError {
    #[error("length is required")]
    MissingLength,
    #[error("length must be a non-negative whole number, got {0}")]
    InvalidLength(f64),
}
