//! Skiff Depot - content-addressed block storage with remote sync.
//!
//! This crate provides:
//! - [`Depot`]: local-first block reads with gateway fallback, tracked
//!   writes, and batched archive upload on [`Depot::flush`]
//! - [`DataRootUpdater`]: publishes a data root as the space's only upload
//!   record
//! - The [`car`] and [`manifest`] encodings used for uploads
//! - [`HttpGateway`], the HTTP [`BlockGateway`]
//!
//! The upload transport is supplied by the host through [`UploadService`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use skiff_crypto::{Codec, KeySigner};
//! use skiff_depot::{Depot, DepotOptions, GatewayConfig, HttpGateway, UploadService};
//! use skiff_storage::MemoryKvStore;
//!
//! # async fn example(uploader: Arc<dyn UploadService>) -> skiff_depot::DepotResult<()> {
//! let depot = Depot::open(
//!     Arc::new(MemoryKvStore::new()),
//!     Arc::new(HttpGateway::new(GatewayConfig::default())?),
//!     uploader,
//!     Arc::new(KeySigner::generate()),
//!     DepotOptions::default(),
//! )
//! .await?;
//!
//! let cid = depot.put_block(b"hello".to_vec(), Codec::Raw).await?;
//! assert_eq!(depot.get(&cid).await?, b"hello");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod car;
pub mod manifest;

mod block;
#[cfg(feature = "config")]
mod config;
mod depot;
mod error;
mod gateway;
mod tracker;
mod updater;
mod upload;

pub use block::Block;
pub use depot::{DEFAULT_NAMESPACE, Depot, DepotOptions, FlushOutcome, FlushReport};
pub use error::{DepotError, DepotResult};
pub use gateway::{BlockGateway, DEFAULT_GATEWAY_URL, GatewayConfig, HttpGateway};
pub use tracker::Tracker;
pub use updater::{DataRootUpdate, DataRootUpdater};
pub use upload::UploadService;
