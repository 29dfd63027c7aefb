//! Skiff Storage - namespaced key-value persistence.
//!
//! The depot keeps two kinds of state on a [`KvStore`]: block bytes keyed
//! by CID string, and the tracker of blocks written since the last flush.
//! Both live under a namespace so several spaces can share one store.
//!
//! Backends:
//!
//! - [`MemoryKvStore`] (always available), for tests and ephemeral sessions
//! - `SurrealKvStore` (behind the **`kv`** feature), an embedded ACID
//!   LSM-tree store that survives restarts
//!
//! [`ScopedKvStore`] pre-binds a namespace and adds JSON helpers.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
