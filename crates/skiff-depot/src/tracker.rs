//! Tracker of blocks written since the last successful flush.
//!
//! All mutation and persistence happen under one async mutex, so a
//! concurrent `put` lands either in the snapshot a flush takes or in the
//! fresh tracker left behind, never in both and never in neither.
//!
//! Only the key set is persisted, as a JSON array of CID strings in a single
//! key. Bytes live in the block store and are re-read on restart.

use indexmap::IndexMap;
use skiff_crypto::{Cid, parse_cid};
use skiff_storage::ScopedKvStore;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::block::Block;
use crate::error::DepotResult;

/// Key under which the pending CID list is stored.
const PENDING_KEY: &str = "pending";

/// Pending blocks in insertion order.
#[derive(Debug)]
pub struct Tracker {
    pending: Mutex<IndexMap<Cid, Block>>,
    state: ScopedKvStore,
}

impl Tracker {
    /// Reload the tracker persisted in `state`, reading block bytes from
    /// `blocks`. Entries whose CID does not parse or whose bytes are missing
    /// are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the persisted list cannot be read.
    pub async fn open(state: ScopedKvStore, blocks: &ScopedKvStore) -> DepotResult<Self> {
        let keys: Vec<String> = state.get_json(PENDING_KEY).await?.unwrap_or_default();
        let mut pending = IndexMap::with_capacity(keys.len());

        for key in keys {
            let cid = match parse_cid(&key) {
                Ok(cid) => cid,
                Err(e) => {
                    warn!(key = %key, error = %e, "dropping unparseable tracker entry");
                    continue;
                },
            };
            match blocks.get(&key).await? {
                Some(bytes) => {
                    pending.insert(cid, Block::new(cid, bytes));
                },
                None => warn!(%cid, "dropping tracker entry without local bytes"),
            }
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), "restored pending blocks");
        }
        Ok(Self {
            pending: Mutex::new(pending),
            state,
        })
    }

    async fn persist(&self, pending: &IndexMap<Cid, Block>) -> DepotResult<()> {
        let keys: Vec<String> = pending.keys().map(ToString::to_string).collect();
        self.state.set_json(PENDING_KEY, &keys).await?;
        Ok(())
    }

    /// Record a written block.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the key set cannot be persisted; the block
    /// is then not tracked.
    pub async fn track(&self, block: Block) -> DepotResult<()> {
        let mut pending = self.pending.lock().await;
        let cid = block.cid;
        let fresh = pending.insert(cid, block).is_none();
        if let Err(e) = self.persist(&pending).await {
            if fresh {
                pending.shift_remove(&cid);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Swap the tracker for an empty one, persist it, and return the previous
    /// contents in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the empty tracker cannot be persisted; the
    /// contents are then left in place.
    pub async fn take(&self) -> DepotResult<Vec<Block>> {
        let mut pending = self.pending.lock().await;
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        let taken = std::mem::take(&mut *pending);
        if let Err(e) = self.persist(&pending).await {
            *pending = taken;
            return Err(e);
        }
        Ok(taken.into_values().collect())
    }

    /// Put a taken snapshot back. Snapshot blocks go first, followed by
    /// anything tracked since the snapshot was taken.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the merged key set cannot be persisted. The
    /// in-memory tracker is restored regardless.
    pub async fn restore(&self, snapshot: Vec<Block>) -> DepotResult<()> {
        let mut pending = self.pending.lock().await;
        let newer = std::mem::take(&mut *pending);
        pending.extend(snapshot.into_iter().map(|b| (b.cid, b)));
        pending.extend(newer);
        self.persist(&pending).await
    }

    /// Number of pending blocks.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Pending CIDs in insertion order.
    pub async fn cids(&self) -> Vec<Cid> {
        self.pending.lock().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_crypto::Codec;
    use skiff_storage::{KvStore, MemoryKvStore};
    use std::sync::Arc;

    fn stores() -> (ScopedKvStore, ScopedKvStore) {
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        (
            ScopedKvStore::new(Arc::clone(&backend), "test:tracker").unwrap(),
            ScopedKvStore::new(backend, "test:blocks").unwrap(),
        )
    }

    async fn stored(blocks: &ScopedKvStore, data: &[u8]) -> Block {
        let block = Block::encode(Codec::Raw, data.to_vec());
        blocks
            .set(&block.cid.to_string(), block.bytes.clone())
            .await
            .unwrap();
        block
    }

    #[tokio::test]
    async fn test_track_and_take() {
        let (state, blocks) = stores();
        let tracker = Tracker::open(state.clone(), &blocks).await.unwrap();
        let a = stored(&blocks, b"a").await;
        let b = stored(&blocks, b"b").await;

        tracker.track(a.clone()).await.unwrap();
        tracker.track(b.clone()).await.unwrap();
        tracker.track(a.clone()).await.unwrap();
        assert_eq!(tracker.cids().await, vec![a.cid, b.cid]);

        let taken = tracker.take().await.unwrap();
        assert_eq!(taken, vec![a, b]);
        assert!(tracker.is_empty().await);

        let persisted: Vec<String> = state.get_json(PENDING_KEY).await.unwrap().unwrap();
        assert!(persisted.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_restores_pending() {
        let (state, blocks) = stores();
        let a = stored(&blocks, b"first").await;
        let b = stored(&blocks, b"second").await;
        {
            let tracker = Tracker::open(state.clone(), &blocks).await.unwrap();
            tracker.track(a.clone()).await.unwrap();
            tracker.track(b.clone()).await.unwrap();
        }

        let reopened = Tracker::open(state, &blocks).await.unwrap();
        assert_eq!(reopened.take().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_reopen_drops_broken_entries() {
        let (state, blocks) = stores();
        let a = stored(&blocks, b"kept").await;
        let missing = Block::encode(Codec::Raw, b"never stored".to_vec());
        state
            .set_json(
                PENDING_KEY,
                &vec![
                    "not-a-cid".to_string(),
                    missing.cid.to_string(),
                    a.cid.to_string(),
                ],
            )
            .await
            .unwrap();

        let tracker = Tracker::open(state, &blocks).await.unwrap();
        assert_eq!(tracker.cids().await, vec![a.cid]);
    }

    #[tokio::test]
    async fn test_restore_puts_snapshot_first() {
        let (state, blocks) = stores();
        let tracker = Tracker::open(state.clone(), &blocks).await.unwrap();
        let old = stored(&blocks, b"old").await;
        let new = stored(&blocks, b"new").await;

        tracker.track(old.clone()).await.unwrap();
        let snapshot = tracker.take().await.unwrap();
        tracker.track(new.clone()).await.unwrap();
        tracker.restore(snapshot).await.unwrap();

        assert_eq!(tracker.cids().await, vec![old.cid, new.cid]);
        let persisted: Vec<String> = state.get_json(PENDING_KEY).await.unwrap().unwrap();
        assert_eq!(persisted, vec![old.cid.to_string(), new.cid.to_string()]);
    }
}
