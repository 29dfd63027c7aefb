//! Publishing the data root as the space's sole upload record.

use std::sync::Arc;
use std::time::Duration;

use skiff_authority::{Authority, InvocationConfig};
use skiff_crypto::{Cid, Signer};
use skiff_ticket::Inventory;
use tracing::{error, info};

use crate::error::{DepotError, DepotResult};
use crate::upload::UploadService;

/// Result of [`DataRootUpdater::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRootUpdate {
    /// `data_root` is now the only upload record.
    Updated,
    /// Nothing or only part of the update happened.
    NotUpdated {
        /// Why.
        reason: String,
    },
}

impl DataRootUpdate {
    /// Whether the update went through.
    #[must_use]
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }
}

/// Replaces a space's upload records with a single data root.
pub struct DataRootUpdater {
    authority: Arc<Authority>,
    uploader: Arc<dyn UploadService>,
    agent: Arc<dyn Signer>,
    timeout: Duration,
}

impl std::fmt::Debug for DataRootUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRootUpdater")
            .field("agent", self.agent.did())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DataRootUpdater {
    /// Create an updater acting as `agent`. Each remote call is bounded by
    /// `timeout`.
    #[must_use]
    pub fn new(
        authority: Arc<Authority>,
        uploader: Arc<dyn UploadService>,
        agent: Arc<dyn Signer>,
        timeout: Duration,
    ) -> Self {
        Self {
            authority,
            uploader,
            agent,
            timeout,
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = DepotResult<T>>,
    ) -> DepotResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(DepotError::Upload(format!("timed out after {:?}", self.timeout)))
            })
    }

    /// Remove every upload record of the space, then add `data_root`.
    ///
    /// Failures are reported in the returned value and logged, never raised.
    pub async fn update(&self, data_root: &Cid, inventory: &dyn Inventory) -> DataRootUpdate {
        let sufficiency = self
            .authority
            .has_sufficient_authority(self.agent.did(), inventory);
        if let Some(reason) = sufficiency.reason() {
            return DataRootUpdate::NotUpdated {
                reason: reason.to_string(),
            };
        }

        let result = match self
            .authority
            .configuration(inventory, Arc::clone(&self.agent))
        {
            Ok(config) => self
                .replace(&config, data_root)
                .await
                .map(|removed| (config, removed)),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok((config, removed)) => {
                info!(space = %config.with, %data_root, removed, "published data root");
                DataRootUpdate::Updated
            },
            Err(e) => {
                error!(agent = %self.agent.did(), %data_root, error = %e, "failed to publish data root");
                DataRootUpdate::NotUpdated {
                    reason: e.to_string(),
                }
            },
        }
    }

    async fn replace(&self, config: &InvocationConfig, data_root: &Cid) -> DepotResult<usize> {
        let existing = self.bounded(self.uploader.list_uploads(config)).await?;
        for root in &existing {
            self.bounded(self.uploader.remove_upload(config, root)).await?;
        }
        self.bounded(self.uploader.add_upload(config, data_root))
            .await?;
        Ok(existing.len())
    }

    /// The space's current data root: the first upload record, if any.
    ///
    /// Returns `Ok(None)` without authority.
    ///
    /// # Errors
    ///
    /// Configuration and transport errors.
    pub async fn current_data_root(&self, inventory: &dyn Inventory) -> DepotResult<Option<Cid>> {
        if !self
            .authority
            .has_sufficient_authority(self.agent.did(), inventory)
            .suffices()
        {
            return Ok(None);
        }
        let config = self
            .authority
            .configuration(inventory, Arc::clone(&self.agent))?;
        let roots = self.bounded(self.uploader.list_uploads(&config)).await?;
        Ok(roots.into_iter().next())
    }
}
