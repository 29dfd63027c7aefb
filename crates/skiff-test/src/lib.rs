//! Skiff Test - shared test utilities.
//!
//! Fixtures that mint signed tickets and populated inventories, and mocks
//! of the remote gateway and upload service.
//!
//! ```toml
//! [dev-dependencies]
//! skiff-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use skiff_test::{MockGateway, RecordingUploadService, SpaceFixture};
//!
//! let fixture = SpaceFixture::new();
//! let inventory = fixture.authorized_inventory();
//! let uploads = RecordingUploadService::new();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a test subscriber once per process, filtered by `RUST_LOG`
/// (default `debug`).
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
