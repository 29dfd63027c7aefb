//! Prelude module - commonly used types for convenient import.
//!
//! Use `use skiff_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Keys and identities
pub use crate::{Did, KeyPair, PublicKey, Signature};

// Signing
pub use crate::{FnSigner, KeySigner, Signer};

// Content addressing
pub use crate::{Cid, Codec, content_id};
