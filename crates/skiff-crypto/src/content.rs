//! Content identifiers.
//!
//! All identifiers produced here are CIDv1 over a SHA2-256 multihash.

pub use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use std::str::FromStr;

use crate::error::{CryptoError, CryptoResult};

/// Multihash code for SHA2-256.
const SHA2_256: u64 = 0x12;

/// IPLD codecs a block may be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Raw bytes (`0x55`).
    Raw,
    /// `UnixFS` protobuf nodes (`0x70`).
    DagPb,
    /// DAG-CBOR (`0x71`).
    DagCbor,
    /// DAG-JSON (`0x0129`).
    DagJson,
}

impl Codec {
    /// The multicodec code.
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::Raw => 0x55,
            Self::DagPb => 0x70,
            Self::DagCbor => 0x71,
            Self::DagJson => 0x0129,
        }
    }

    /// Look up a codec by its multicodec code.
    #[must_use]
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0x55 => Some(Self::Raw),
            0x70 => Some(Self::DagPb),
            0x71 => Some(Self::DagCbor),
            0x0129 => Some(Self::DagJson),
            _ => None,
        }
    }
}

/// Compute the CIDv1 of `data` tagged with `codec`.
#[must_use]
pub fn content_id(codec: Codec, data: &[u8]) -> Cid {
    Cid::new_v1(codec.code(), Code::Sha2_256.digest(data))
}

/// Parse a CID from its string form.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidCid`] if the string does not decode.
pub fn parse_cid(value: &str) -> CryptoResult<Cid> {
    Cid::from_str(value).map_err(|e| CryptoError::InvalidCid(format!("{value}: {e}")))
}

/// Whether `data` hashes to `cid`.
///
/// Only SHA2-256 multihashes are checked. `None` means the CID's hash
/// function is not one this crate verifies.
#[must_use]
pub fn verify_content_id(cid: &Cid, data: &[u8]) -> Option<bool> {
    if cid.hash().code() != SHA2_256 {
        return None;
    }
    Some(cid.hash().digest() == Code::Sha2_256.digest(data).digest())
}
