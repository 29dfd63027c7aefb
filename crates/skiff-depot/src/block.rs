//! Blocks.

use skiff_crypto::{Cid, Codec, content_id};

/// Bytes and the CID naming them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Content identifier.
    pub cid: Cid,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

impl Block {
    /// Pair `bytes` with an already known `cid`. The CID is not checked.
    #[must_use]
    pub fn new(cid: Cid, bytes: Vec<u8>) -> Self {
        Self { cid, bytes }
    }

    /// Hash `bytes` into a CIDv1 tagged with `codec`.
    #[must_use]
    pub fn encode(codec: Codec, bytes: Vec<u8>) -> Self {
        let cid = content_id(codec, &bytes);
        Self { cid, bytes }
    }
}
