//! Error types for the store layer.

/// Errors a [`Store`](crate::Store) backend can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be interpreted.
    #[error("corrupt value under key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
