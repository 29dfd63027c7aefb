//! The depot: a content-addressed block store backed by a local key-value
//! store, with the remote gateway as fallback for reads and batched archive
//! upload for writes.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use skiff_authority::{Authority, LACKING_AUTHORITY};
use skiff_crypto::{Cid, Codec, Signer};
use skiff_storage::{KvStore, ScopedKvStore};
use skiff_ticket::{Delegation, Inventory};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::error::{DepotError, DepotResult};
use crate::gateway::BlockGateway;
use crate::tracker::Tracker;
use crate::upload::UploadService;
use crate::{car, manifest};

/// Default namespace prefix in the local store.
pub const DEFAULT_NAMESPACE: &str = "skiff";

/// Depot settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotOptions {
    /// Prefix of the local store namespaces (`{prefix}:blocks`,
    /// `{prefix}:tracker`).
    pub namespace: String,
    /// Upper bound on one gateway fetch, including body download.
    pub fetch_timeout: Duration,
    /// Upper bound on one archive upload.
    pub upload_timeout: Duration,
}

impl Default for DepotOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            fetch_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(120),
        }
    }
}

/// Result of one [`Depot::flush`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was attempted because the agent cannot act on a space yet.
    Skipped {
        /// Why.
        reason: String,
    },
    /// The tracker was empty.
    Idle,
    /// One archive was uploaded.
    Uploaded {
        /// CID of the manifest, the archive's root.
        manifest: Cid,
        /// Flushed block CIDs in tracker order.
        blocks: Vec<Cid>,
        /// The data root the flush was requested for.
        data_root: Cid,
    },
    /// The upload failed and the blocks went back to the tracker.
    Failed {
        /// The upload error.
        reason: String,
    },
}

impl FlushOutcome {
    /// Whether an archive reached the upload service.
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

/// A flush outcome and when it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Completion time.
    pub at: DateTime<Utc>,
    /// What happened.
    pub outcome: FlushOutcome,
}

/// Content-addressed block store with remote fallback and batched upload.
pub struct Depot {
    blocks: ScopedKvStore,
    tracker: Tracker,
    gateway: Arc<dyn BlockGateway>,
    uploader: Arc<dyn UploadService>,
    agent: Arc<dyn Signer>,
    authority: Arc<Authority>,
    inflight: DashMap<Cid, Arc<Mutex<()>>>,
    last_flush: RwLock<Option<FlushReport>>,
    options: DepotOptions,
}

impl std::fmt::Debug for Depot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Depot")
            .field("agent", self.agent.did())
            .field("blocks", &self.blocks)
            .field("inflight", &self.inflight.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Depot {
    /// Open a depot on `store`, restoring any tracker persisted by a previous
    /// instance with the same namespace.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the namespace is invalid or the persisted
    /// tracker cannot be read.
    pub async fn open(
        store: Arc<dyn KvStore>,
        gateway: Arc<dyn BlockGateway>,
        uploader: Arc<dyn UploadService>,
        agent: Arc<dyn Signer>,
        options: DepotOptions,
    ) -> DepotResult<Self> {
        let blocks = ScopedKvStore::new(Arc::clone(&store), format!("{}:blocks", options.namespace))?;
        let state = ScopedKvStore::new(store, format!("{}:tracker", options.namespace))?;
        let tracker = Tracker::open(state, &blocks).await?;

        debug!(agent = %agent.did(), namespace = %options.namespace, "opened depot");
        Ok(Self {
            blocks,
            tracker,
            gateway,
            uploader,
            agent,
            authority: Arc::new(Authority::new()),
            inflight: DashMap::new(),
            last_flush: RwLock::new(None),
            options,
        })
    }

    /// Share an existing resolver instead of a private one.
    #[must_use]
    pub fn with_authority(mut self, authority: Arc<Authority>) -> Self {
        self.authority = authority;
        self
    }

    /// The resolver used by [`flush`](Self::flush).
    #[must_use]
    pub fn authority(&self) -> &Arc<Authority> {
        &self.authority
    }

    /// The settings in use.
    #[must_use]
    pub fn options(&self) -> &DepotOptions {
        &self.options
    }

    /// The blocks written since the last successful flush.
    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Read a block, locally if present, otherwise from the gateway.
    ///
    /// A fetched block is stored locally before it is returned. Concurrent
    /// reads of the same missing CID share one fetch.
    ///
    /// # Errors
    ///
    /// [`DepotError::NotFound`] if the gateway does not have the block,
    /// [`DepotError::Fetch`] on transport failure or timeout, storage errors
    /// from the local store.
    pub async fn get(&self, cid: &Cid) -> DepotResult<Vec<u8>> {
        let key = cid.to_string();
        if let Some(bytes) = self.blocks.get(&key).await? {
            return Ok(bytes);
        }

        let gate = Arc::clone(self.inflight.entry(*cid).or_default().value());
        let result = {
            let _guard = gate.lock().await;
            self.fetch_locked(cid, &key).await
        };
        self.inflight.remove_if(cid, |_, g| Arc::ptr_eq(g, &gate));
        result
    }

    async fn fetch_locked(&self, cid: &Cid, key: &str) -> DepotResult<Vec<u8>> {
        // a concurrent reader may have finished the fetch while we waited
        if let Some(bytes) = self.blocks.get(key).await? {
            return Ok(bytes);
        }

        let bytes = tokio::time::timeout(self.options.fetch_timeout, self.gateway.fetch(cid))
            .await
            .map_err(|_| DepotError::Fetch {
                cid: key.to_string(),
                reason: format!("timed out after {:?}", self.options.fetch_timeout),
            })??;

        self.blocks.set(key, bytes.clone()).await?;
        debug!(%cid, size = bytes.len(), "cached fetched block");
        Ok(bytes)
    }

    /// Store `bytes` under `cid` and track the block for the next flush.
    ///
    /// The CID is taken as given and returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the block or the tracker cannot be
    /// persisted.
    pub async fn put(&self, cid: Cid, bytes: Vec<u8>) -> DepotResult<Cid> {
        self.blocks.set(&cid.to_string(), bytes.clone()).await?;
        self.tracker.track(Block::new(cid, bytes)).await?;
        debug!(%cid, "put block");
        Ok(cid)
    }

    /// Hash `bytes` into a CIDv1 (SHA2-256) tagged with `codec`, then
    /// [`put`](Self::put) it.
    ///
    /// # Errors
    ///
    /// Same as [`put`](Self::put).
    pub async fn put_block(&self, bytes: Vec<u8>, codec: Codec) -> DepotResult<Cid> {
        let block = Block::encode(codec, bytes);
        self.put(block.cid, block.bytes).await
    }

    /// Upload every tracked block in one archive.
    ///
    /// Without sufficient authority, or without a resolvable space or agent
    /// delegation, nothing happens and [`FlushOutcome::Skipped`] is returned.
    /// Otherwise the tracker is emptied atomically, a manifest listing the
    /// taken CIDs is appended, and the archive is uploaded under the
    /// manifest's CID with the agent delegations plus `proofs`. If the upload
    /// fails, the taken blocks go back to the tracker.
    ///
    /// # Errors
    ///
    /// [`DepotError::Upload`] if the upload fails or times out, decode errors
    /// from agent tickets, storage and encoding errors.
    pub async fn flush(
        &self,
        data_root: &Cid,
        proofs: &[Delegation],
        inventory: &dyn Inventory,
    ) -> DepotResult<FlushOutcome> {
        let sufficiency = self
            .authority
            .has_sufficient_authority(self.agent.did(), inventory);
        if let Some(reason) = sufficiency.reason() {
            debug!(agent = %self.agent.did(), "skipping flush: {reason}");
            return Ok(self.record(FlushOutcome::Skipped {
                reason: reason.to_string(),
            }));
        }

        let mut config = match self
            .authority
            .configuration(inventory, Arc::clone(&self.agent))
        {
            Ok(config) => config,
            Err(e) if e.is_config() => {
                debug!(error = %e, "skipping flush");
                return Ok(self.record(FlushOutcome::Skipped {
                    reason: e.to_string(),
                }));
            },
            Err(e) => return Err(e.into()),
        };
        config.proofs.extend(proofs.iter().cloned());

        let taken = self.tracker.take().await?;
        if taken.is_empty() {
            return Ok(self.record(FlushOutcome::Idle));
        }

        let cids: Vec<Cid> = taken.iter().map(|b| b.cid).collect();
        let (root, archive) = match package(&cids, &taken) {
            Ok(packaged) => packaged,
            Err(e) => {
                self.restore(taken).await;
                return Err(e);
            },
        };

        info!(
            space = %config.with,
            manifest = %root,
            blocks = cids.len(),
            bytes = archive.len(),
            "uploading archive"
        );
        let uploaded = tokio::time::timeout(
            self.options.upload_timeout,
            self.uploader.store_archive(&config, &root, archive),
        )
        .await
        .unwrap_or_else(|_| {
            Err(DepotError::Upload(format!(
                "timed out after {:?}",
                self.options.upload_timeout
            )))
        });

        match uploaded {
            Ok(()) => Ok(self.record(FlushOutcome::Uploaded {
                manifest: root,
                blocks: cids,
                data_root: *data_root,
            })),
            Err(e) => {
                warn!(manifest = %root, error = %e, "upload failed, restoring tracker");
                self.restore(taken).await;
                let reason = match e {
                    DepotError::Upload(reason) => reason,
                    other => other.to_string(),
                };
                self.record(FlushOutcome::Failed {
                    reason: reason.clone(),
                });
                Err(DepotError::Upload(reason))
            },
        }
    }

    async fn restore(&self, taken: Vec<Block>) {
        if let Err(e) = self.tracker.restore(taken).await {
            warn!(error = %e, "failed to persist restored tracker");
        }
    }

    fn record(&self, outcome: FlushOutcome) -> FlushOutcome {
        let report = FlushReport {
            at: Utc::now(),
            outcome: outcome.clone(),
        };
        match self.last_flush.write() {
            Ok(mut last) => *last = Some(report),
            Err(poisoned) => *poisoned.into_inner() = Some(report),
        }
        outcome
    }

    /// The most recent flush, if any ran since the depot was opened.
    #[must_use]
    pub fn last_flush(&self) -> Option<FlushReport> {
        match self.last_flush.read() {
            Ok(last) => last.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Build the manifest and the archive rooted at it, manifest last.
fn package(cids: &[Cid], blocks: &[Block]) -> DepotResult<(Cid, Vec<u8>)> {
    let manifest = manifest::encode(cids)?;
    let root = manifest.cid;
    let mut all = Vec::with_capacity(blocks.len().saturating_add(1));
    all.extend_from_slice(blocks);
    all.push(manifest);
    Ok((root, car::encode(&[root], &all)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skiff_authority::InvocationConfig;
    use skiff_crypto::{KeySigner, content_id};
    use skiff_storage::MemoryKvStore;
    use skiff_ticket::{Capability, Category, MemoryInventory, codec};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct SlowGateway {
        blocks: HashMap<Cid, Vec<u8>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BlockGateway for SlowGateway {
        async fn fetch(&self, cid: &Cid) -> DepotResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.blocks.get(cid).cloned().ok_or(DepotError::NotFound {
                cid: cid.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct Uploads {
        archives: std::sync::Mutex<Vec<(Cid, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl UploadService for Uploads {
        async fn store_archive(
            &self,
            _config: &InvocationConfig,
            root: &Cid,
            archive: Vec<u8>,
        ) -> DepotResult<()> {
            if self.fail {
                return Err(DepotError::Upload("service unavailable".into()));
            }
            self.archives.lock().unwrap().push((*root, archive));
            Ok(())
        }

        async fn list_uploads(&self, _config: &InvocationConfig) -> DepotResult<Vec<Cid>> {
            Ok(Vec::new())
        }

        async fn remove_upload(&self, _config: &InvocationConfig, _root: &Cid) -> DepotResult<()> {
            Ok(())
        }

        async fn add_upload(&self, _config: &InvocationConfig, _root: &Cid) -> DepotResult<()> {
            Ok(())
        }
    }

    async fn depot(
        gateway: Arc<SlowGateway>,
        uploads: Arc<Uploads>,
        agent: Arc<KeySigner>,
    ) -> Depot {
        Depot::open(
            Arc::new(MemoryKvStore::new()),
            gateway,
            uploads,
            agent,
            DepotOptions::default(),
        )
        .await
        .unwrap()
    }

    /// space -> account -> agent, all granting `*` over the space
    fn authorized(agent: &KeySigner) -> MemoryInventory {
        let space = KeySigner::generate();
        let account = KeySigner::generate();
        let root = Delegation::builder(account.did().clone())
            .capability(Capability::wildcard(space.did().as_str()))
            .sign(&space)
            .unwrap()
            .to_ticket()
            .unwrap();
        let delegated = Delegation::builder(agent.did().clone())
            .capability(Capability::wildcard(space.did().as_str()))
            .proof(codec::link_of(&root).unwrap())
            .sign(&account)
            .unwrap()
            .to_ticket()
            .unwrap();
        MemoryInventory::new()
            .with(Category::Account, root)
            .unwrap()
            .with(Category::Agent, delegated)
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_is_local() {
        let gateway = Arc::new(SlowGateway::default());
        let depot = depot(
            Arc::clone(&gateway),
            Arc::default(),
            Arc::new(KeySigner::generate()),
        )
        .await;

        let cid = depot.put_block(b"hello".to_vec(), Codec::Raw).await.unwrap();
        assert_eq!(cid, content_id(Codec::Raw, b"hello"));
        assert_eq!(depot.get(&cid).await.unwrap(), b"hello");
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_put_keeps_given_cid() {
        let depot = depot(
            Arc::default(),
            Arc::default(),
            Arc::new(KeySigner::generate()),
        )
        .await;
        let cid = content_id(Codec::DagCbor, b"not these bytes");

        assert_eq!(depot.put(cid, b"hello".to_vec()).await.unwrap(), cid);
        assert_eq!(depot.get(&cid).await.unwrap(), b"hello");
        assert_eq!(depot.tracker().cids().await, vec![cid]);
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let cid = content_id(Codec::Raw, b"remote");
        let gateway = Arc::new(SlowGateway {
            blocks: HashMap::from([(cid, b"remote".to_vec())]),
            ..SlowGateway::default()
        });
        let depot = Arc::new(
            depot(
                Arc::clone(&gateway),
                Arc::default(),
                Arc::new(KeySigner::generate()),
            )
            .await,
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let depot = Arc::clone(&depot);
                tokio::spawn(async move { depot.get(&cid).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), b"remote");
        }

        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert!(depot.inflight.is_empty());
        // fetched blocks are cached, not tracked for upload
        assert!(depot.tracker().is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_block() {
        let depot = depot(
            Arc::default(),
            Arc::default(),
            Arc::new(KeySigner::generate()),
        )
        .await;
        let cid = content_id(Codec::Raw, b"nowhere");

        assert!(matches!(
            depot.get(&cid).await,
            Err(DepotError::NotFound { .. })
        ));
        assert!(depot.inflight.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let cid = content_id(Codec::Raw, b"slow");
        let gateway = Arc::new(SlowGateway {
            blocks: HashMap::from([(cid, b"slow".to_vec())]),
            ..SlowGateway::default()
        });
        let depot = Depot::open(
            Arc::new(MemoryKvStore::new()),
            gateway,
            Arc::new(Uploads::default()),
            Arc::new(KeySigner::generate()),
            DepotOptions {
                fetch_timeout: Duration::from_millis(5),
                ..DepotOptions::default()
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            depot.get(&cid).await,
            Err(DepotError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_flush_without_authority_is_skipped() {
        let uploads = Arc::new(Uploads::default());
        let depot = depot(
            Arc::default(),
            Arc::clone(&uploads),
            Arc::new(KeySigner::generate()),
        )
        .await;
        let cid = depot.put_block(b"data".to_vec(), Codec::Raw).await.unwrap();

        let outcome = depot
            .flush(&cid, &[], &MemoryInventory::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FlushOutcome::Skipped {
                reason: LACKING_AUTHORITY.to_string()
            }
        );
        assert!(uploads.archives.lock().unwrap().is_empty());
        assert_eq!(depot.tracker().len().await, 1);
        assert_eq!(depot.last_flush().unwrap().outcome, outcome);
    }

    #[tokio::test]
    async fn test_flush_uploads_blocks_and_manifest() {
        let agent = Arc::new(KeySigner::generate());
        let inventory = authorized(&agent);
        let uploads = Arc::new(Uploads::default());
        let depot = depot(Arc::default(), Arc::clone(&uploads), Arc::clone(&agent)).await;

        let a = depot.put_block(b"a".to_vec(), Codec::Raw).await.unwrap();
        let b = depot.put_block(b"b".to_vec(), Codec::Raw).await.unwrap();
        let outcome = depot.flush(&b, &[], &inventory).await.unwrap();

        let FlushOutcome::Uploaded {
            manifest: root,
            blocks,
            data_root,
        } = outcome
        else {
            panic!("expected upload, got {outcome:?}");
        };
        assert_eq!(blocks, vec![a, b]);
        assert_eq!(data_root, b);

        let archives = uploads.archives.lock().unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].0, root);
        let archive = car::decode(&archives[0].1).unwrap();
        assert_eq!(archive.roots, vec![root]);
        assert_eq!(archive.blocks.len(), 3);
        assert_eq!(archive.blocks[2].cid, root);
        assert_eq!(manifest::decode(&archive.blocks[2].bytes).unwrap(), vec![a, b]);
        drop(archives);

        assert!(depot.tracker().is_empty().await);
        assert_eq!(
            depot.flush(&b, &[], &inventory).await.unwrap(),
            FlushOutcome::Idle
        );
    }

    #[tokio::test]
    async fn test_failed_upload_restores_tracker() {
        let agent = Arc::new(KeySigner::generate());
        let inventory = authorized(&agent);
        let uploads = Arc::new(Uploads {
            fail: true,
            ..Uploads::default()
        });
        let depot = depot(Arc::default(), uploads, agent).await;
        let cid = depot.put_block(b"keep me".to_vec(), Codec::Raw).await.unwrap();

        let err = depot.flush(&cid, &[], &inventory).await.unwrap_err();
        assert!(matches!(err, DepotError::Upload(ref reason) if reason == "service unavailable"));
        assert_eq!(depot.tracker().cids().await, vec![cid]);
        assert!(matches!(
            depot.last_flush().unwrap().outcome,
            FlushOutcome::Failed { .. }
        ));
    }
}
