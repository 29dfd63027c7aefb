//! Skiff Authority - who may act on a space.
//!
//! This crate provides:
//! - [`Authority`], which walks ticket inventories to find root proofs and
//!   derive the [`InvocationConfig`] for remote operations
//! - The [`issuer`] functions that mint new delegations
//!
//! # Example
//!
//! ```
//! use skiff_authority::Authority;
//! use skiff_crypto::{KeySigner, Signer};
//! use skiff_ticket::MemoryInventory;
//!
//! let agent = KeySigner::generate();
//! let authority = Authority::new();
//!
//! let status = authority.has_sufficient_authority(agent.did(), &MemoryInventory::new());
//! assert!(!status.suffices());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod issuer;

mod error;
mod resolver;

pub use error::{AuthorityError, AuthorityResult};
pub use issuer::{
    FsTicketMatcher, delegate_ticket, identity_to_agent_delegation, issue_file_system_origin,
    matches_file_system_ticket,
};
pub use resolver::{
    Authority, AuthorityStatus, InvocationConfig, LACKING_AUTHORITY, Sufficiency,
};
