//! Shared harness for integration tests.

use std::sync::Arc;

use skiff_depot::{Depot, DepotOptions};
use skiff_storage::{KvStore, MemoryKvStore};
use skiff_test::{MockGateway, RecordingUploadService, SpaceFixture};

/// A depot wired to mock remotes, acting as the fixture's agent.
#[allow(dead_code)]
pub struct DepotHarness {
    /// Keys and tickets.
    pub fixture: SpaceFixture,
    /// The backing store, shareable with a second depot.
    pub store: Arc<dyn KvStore>,
    /// The mock gateway.
    pub gateway: Arc<MockGateway>,
    /// The recording upload service.
    pub uploads: Arc<RecordingUploadService>,
    /// The depot under test.
    pub depot: Depot,
}

#[allow(dead_code)]
impl DepotHarness {
    /// Build a harness over an in-memory store and an empty gateway.
    pub async fn new() -> Self {
        Self::with_gateway(MockGateway::new()).await
    }

    /// Build a harness with a prepared gateway.
    pub async fn with_gateway(gateway: MockGateway) -> Self {
        skiff_test::init_test_logging();
        let fixture = SpaceFixture::new();
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let gateway = Arc::new(gateway);
        let uploads = Arc::new(RecordingUploadService::new());
        let depot = open_depot(&store, &gateway, &uploads, &fixture).await;
        Self {
            fixture,
            store,
            gateway,
            uploads,
            depot,
        }
    }

    /// Open a second depot on the same store and remotes, as after a restart.
    pub async fn reopen(&self) -> Depot {
        open_depot(&self.store, &self.gateway, &self.uploads, &self.fixture).await
    }
}

/// Open a depot on `store` for the fixture's agent.
pub async fn open_depot(
    store: &Arc<dyn KvStore>,
    gateway: &Arc<MockGateway>,
    uploads: &Arc<RecordingUploadService>,
    fixture: &SpaceFixture,
) -> Depot {
    Depot::open(
        Arc::clone(store),
        Arc::clone(gateway) as _,
        Arc::clone(uploads) as _,
        fixture.agent_signer(),
        DepotOptions::default(),
    )
    .await
    .expect("failed to open depot")
}
