//! Skiff Crypto - identity and content-addressing primitives.
//!
//! This crate provides:
//! - Ed25519 key pairs with secure memory handling
//! - `did:key` identifiers derived from those keys
//! - The [`Signer`] abstraction used to issue delegations
//! - CIDv1 content identifiers over SHA2-256
//!
//! # Example
//!
//! ```
//! use skiff_crypto::{Codec, KeySigner, Signer, content_id};
//!
//! let signer = KeySigner::generate();
//! assert!(signer.did().as_str().starts_with("did:key:z"));
//!
//! let signature = signer.sign(b"payload").unwrap();
//! assert!(skiff_crypto::verify_did_signature(
//!     signer.did(),
//!     signer.signature_algorithm(),
//!     b"payload",
//!     &signature,
//! )
//! .is_ok());
//!
//! let cid = content_id(Codec::Raw, b"hello");
//! assert_eq!(cid, content_id(Codec::Raw, b"hello"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod content;
mod did;
mod error;
mod keypair;
mod signature;
mod signer;

pub use content::{Cid, Codec, content_id, parse_cid, verify_content_id};
pub use did::Did;
pub use error::{CryptoError, CryptoResult};
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
pub use signer::{EDDSA, FnSigner, KeySigner, Signer, verify_did_signature};
