//! Remote upload service boundary.
//!
//! The transport (invocation encoding, receipts, retries on the wire) is
//! provided by the host. The depot only needs to hand over an archive keyed
//! by its root and to manage the list of upload records of a space.

use async_trait::async_trait;
use skiff_authority::InvocationConfig;
use skiff_crypto::Cid;

use crate::error::DepotResult;

/// Stores archives and upload records on behalf of a space.
///
/// Implementations report failures as [`DepotError::Upload`](crate::DepotError::Upload).
/// Calls are made at most once; the depot never retries.
#[async_trait]
pub trait UploadService: Send + Sync {
    /// Store a CAR archive whose root is `root`.
    async fn store_archive(
        &self,
        config: &InvocationConfig,
        root: &Cid,
        archive: Vec<u8>,
    ) -> DepotResult<()>;

    /// Roots of the space's current upload records.
    async fn list_uploads(&self, config: &InvocationConfig) -> DepotResult<Vec<Cid>>;

    /// Remove the upload record for `root`.
    async fn remove_upload(&self, config: &InvocationConfig, root: &Cid) -> DepotResult<()>;

    /// Register `root` as an upload of the space.
    async fn add_upload(&self, config: &InvocationConfig, root: &Cid) -> DepotResult<()>;
}
