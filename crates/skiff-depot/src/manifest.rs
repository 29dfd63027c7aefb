//! Flush manifests: the ordered list of CIDs uploaded in one archive.

use skiff_crypto::{Cid, Codec};

use crate::block::Block;
use crate::error::{DepotError, DepotResult};

/// Encode `cids` as a DAG-CBOR list block.
///
/// # Errors
///
/// Returns [`DepotError::Encoding`] if serialization fails.
pub fn encode(cids: &[Cid]) -> DepotResult<Block> {
    let bytes = serde_ipld_dagcbor::to_vec(cids)
        .map_err(|e| DepotError::Encoding(format!("manifest: {e}")))?;
    Ok(Block::encode(Codec::DagCbor, bytes))
}

/// Decode a manifest block's bytes.
///
/// # Errors
///
/// Returns [`DepotError::Encoding`] if the bytes are not a list of CIDs.
pub fn decode(bytes: &[u8]) -> DepotResult<Vec<Cid>> {
    serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| DepotError::Encoding(format!("manifest: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_crypto::content_id;

    #[test]
    fn test_manifest_lists_cids_in_order() {
        let cids = vec![
            content_id(Codec::Raw, b"b"),
            content_id(Codec::Raw, b"a"),
        ];
        let block = encode(&cids).unwrap();

        assert_eq!(block.cid.codec(), Codec::DagCbor.code());
        assert_eq!(decode(&block.bytes).unwrap(), cids);
        assert_eq!(encode(&cids).unwrap().cid, block.cid);
    }

    #[test]
    fn test_empty_manifest() {
        let block = encode(&[]).unwrap();
        assert_eq!(block.bytes, vec![0x80]);
    }
}
