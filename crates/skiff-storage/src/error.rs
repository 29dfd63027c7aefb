//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend failed while reading or writing.
    #[error("storage error: {0}")]
    Internal(String),

    /// The backing store could not be opened.
    #[error("failed to open store: {0}")]
    Open(String),

    /// A stored value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace or key is not usable.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
