//! Depot error types.

use skiff_authority::AuthorityError;
use skiff_storage::StorageError;
use thiserror::Error;

/// Errors from depot operations.
#[derive(Debug, Error)]
pub enum DepotError {
    /// The gateway answered with a non-success status.
    #[error("block not found: {cid}")]
    NotFound {
        /// The requested CID.
        cid: String,
    },

    /// The block could not be fetched: network failure, timeout, oversized
    /// or mismatching content.
    #[error("failed to fetch {cid}: {reason}")]
    Fetch {
        /// The requested CID.
        cid: String,
        /// What went wrong.
        reason: String,
    },

    /// The archive upload failed or timed out.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The local store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Resolving the invocation configuration failed.
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// A manifest or archive could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The HTTP client could not be built.
    #[error("gateway client error: {0}")]
    Client(String),
}

/// Result type for depot operations.
pub type DepotResult<T> = Result<T, DepotError>;
