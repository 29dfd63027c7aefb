//! Mock remotes for depot tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use skiff_authority::InvocationConfig;
use skiff_crypto::{Cid, Codec, Did, content_id};
use skiff_depot::{BlockGateway, DepotError, DepotResult, UploadService};

/// In-memory [`BlockGateway`] that counts fetches.
///
/// Uses `std::sync::Mutex` so builder methods work without a runtime.
#[derive(Debug, Default)]
pub struct MockGateway {
    blocks: Mutex<HashMap<Cid, Vec<u8>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockGateway {
    /// An empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` under their CID for `codec`.
    #[must_use]
    pub fn with_block(self, codec: Codec, bytes: &[u8]) -> Self {
        self.insert(content_id(codec, bytes), bytes.to_vec());
        self
    }

    /// Sleep before answering each fetch.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve `bytes` under `cid`.
    pub fn insert(&self, cid: Cid, bytes: Vec<u8>) {
        if let Ok(mut blocks) = self.blocks.lock() {
            blocks.insert(cid, bytes);
        }
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockGateway for MockGateway {
    async fn fetch(&self, cid: &Cid) -> DepotResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.blocks
            .lock()
            .ok()
            .and_then(|blocks| blocks.get(cid).cloned())
            .ok_or_else(|| DepotError::NotFound {
                cid: cid.to_string(),
            })
    }
}

/// One archive handed to [`RecordingUploadService::store_archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedArchive {
    /// The root the archive was stored under.
    pub root: Cid,
    /// CAR bytes.
    pub bytes: Vec<u8>,
    /// The invoking agent.
    pub issuer: Did,
    /// The space invoked on.
    pub space: Did,
    /// Number of proofs attached.
    pub proofs: usize,
}

/// [`UploadService`] that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingUploadService {
    archives: Mutex<Vec<RecordedArchive>>,
    uploads: Mutex<Vec<Cid>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl RecordingUploadService {
    /// A service that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `roots` as existing upload records.
    #[must_use]
    pub fn with_uploads(self, roots: impl IntoIterator<Item = Cid>) -> Self {
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.extend(roots);
        }
        self
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Archives stored so far.
    #[must_use]
    pub fn archives(&self) -> Vec<RecordedArchive> {
        self.archives.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Current upload records.
    #[must_use]
    pub fn uploads(&self) -> Vec<Cid> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    /// Number of calls of any kind, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: &str) -> DepotResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DepotError::Upload(format!("{op}: service unavailable")));
        }
        Ok(())
    }

    fn with_uploads_mut(&self, f: impl FnOnce(&mut Vec<Cid>)) -> DepotResult<()> {
        let mut uploads = self
            .uploads
            .lock()
            .map_err(|e| DepotError::Upload(e.to_string()))?;
        f(&mut uploads);
        Ok(())
    }
}

#[async_trait]
impl UploadService for RecordingUploadService {
    async fn store_archive(
        &self,
        config: &InvocationConfig,
        root: &Cid,
        archive: Vec<u8>,
    ) -> DepotResult<()> {
        self.check("store")?;
        let record = RecordedArchive {
            root: *root,
            bytes: archive,
            issuer: config.issuer.did().clone(),
            space: config.with.clone(),
            proofs: config.proofs.len(),
        };
        self.archives
            .lock()
            .map_err(|e| DepotError::Upload(e.to_string()))?
            .push(record);
        Ok(())
    }

    async fn list_uploads(&self, _config: &InvocationConfig) -> DepotResult<Vec<Cid>> {
        self.check("list")?;
        Ok(self.uploads())
    }

    async fn remove_upload(&self, _config: &InvocationConfig, root: &Cid) -> DepotResult<()> {
        self.check("remove")?;
        self.with_uploads_mut(|uploads| uploads.retain(|r| r != root))
    }

    async fn add_upload(&self, _config: &InvocationConfig, root: &Cid) -> DepotResult<()> {
        self.check("add")?;
        self.with_uploads_mut(|uploads| uploads.push(*root))
    }
}
