//! Skiff Ticket - signed capability delegations.
//!
//! This crate provides:
//! - [`Ticket`], the portable form of a delegation
//! - [`Delegation`] and [`DelegationBuilder`] for issuing and inspecting grants
//! - The [`codec`] converting between the two
//! - The [`Inventory`] abstraction with an in-memory implementation and the
//!   root-proof walk
//! - [`FsPath`] for file system capability URIs
//!
//! # Example
//!
//! ```
//! use skiff_crypto::{Did, KeySigner};
//! use skiff_ticket::{Capability, Delegation, codec};
//!
//! let space = KeySigner::generate();
//! let agent = Did::parse("did:key:zAgent").unwrap();
//!
//! let ticket = Delegation::builder(agent)
//!     .capability(Capability::wildcard("did:key:zSpace"))
//!     .sign(&space)
//!     .unwrap()
//!     .to_ticket()
//!     .unwrap();
//!
//! let decoded = codec::decode(&ticket).unwrap();
//! assert!(decoded.grants_wildcard());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;

mod capability;
mod delegation;
mod error;
mod inventory;
mod path;
mod ticket;

pub use capability::{Capability, FS_WILDCARD, WILDCARD, WNFS_SCHEME};
pub use delegation::{Delegation, DelegationBuilder, Expiration};
pub use error::{TicketError, TicketResult};
pub use inventory::{CodecProofResolver, Inventory, MemoryInventory, ProofResolver};
pub use path::FsPath;
pub use ticket::{Category, Link, Ticket};
