//! CARv1 archives.
//!
//! ```text
//! varint(len) | dag-cbor { roots: [CID], version: 1 }
//! varint(len) | cid bytes | block bytes      (repeated)
//! ```

use serde::{Deserialize, Serialize};
use skiff_crypto::Cid;

use crate::block::Block;
use crate::error::{DepotError, DepotResult};

const CAR_VERSION: u64 = 1;

/// Longest unsigned varint we accept (u64).
const MAX_VARINT_BYTES: usize = 10;

#[derive(Serialize, Deserialize)]
struct CarHeader {
    roots: Vec<Cid>,
    version: u64,
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        // masked to 7 bits
        #[allow(clippy::cast_possible_truncation)]
        let byte = (value & 0x7f) as u8;
        value = value.wrapping_shr(7);
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read a varint, returning the value and the number of bytes consumed.
fn read_varint(input: &[u8]) -> DepotResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    for (index, byte) in input.iter().take(MAX_VARINT_BYTES).enumerate() {
        let bits = u64::from(byte & 0x7f)
            .checked_shl(shift)
            .ok_or_else(|| DepotError::Encoding("varint overflow".into()))?;
        value |= bits;
        if byte & 0x80 == 0 {
            return Ok((value, index.saturating_add(1)));
        }
        shift = shift.saturating_add(7);
    }
    Err(DepotError::Encoding("truncated varint".into()))
}

fn write_section(out: &mut Vec<u8>, parts: &[&[u8]]) {
    let len = parts.iter().map(|p| p.len()).fold(0usize, usize::saturating_add);
    write_varint(out, u64::try_from(len).unwrap_or(u64::MAX));
    for part in parts {
        out.extend_from_slice(part);
    }
}

/// Encode `blocks` into an archive rooted at `roots`.
///
/// # Errors
///
/// Returns [`DepotError::Encoding`] if the header cannot be serialized.
pub fn encode(roots: &[Cid], blocks: &[Block]) -> DepotResult<Vec<u8>> {
    let header = serde_ipld_dagcbor::to_vec(&CarHeader {
        roots: roots.to_vec(),
        version: CAR_VERSION,
    })
    .map_err(|e| DepotError::Encoding(format!("car header: {e}")))?;

    let body: usize = blocks
        .iter()
        .map(|b| b.bytes.len().saturating_add(64))
        .fold(0, usize::saturating_add);
    let mut out = Vec::with_capacity(header.len().saturating_add(body));

    write_section(&mut out, &[&header]);
    for block in blocks {
        write_section(&mut out, &[&block.cid.to_bytes(), &block.bytes]);
    }
    Ok(out)
}

/// A decoded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Root CIDs from the header.
    pub roots: Vec<Cid>,
    /// Blocks in archive order.
    pub blocks: Vec<Block>,
}

impl Archive {
    /// The block named `cid`, if present.
    #[must_use]
    pub fn block(&self, cid: &Cid) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.cid == cid)
    }
}

fn next_section(input: &[u8]) -> DepotResult<(&[u8], &[u8])> {
    let (len, consumed) = read_varint(input)?;
    let len = usize::try_from(len).map_err(|_| DepotError::Encoding("section too large".into()))?;
    let rest = input
        .get(consumed..)
        .ok_or_else(|| DepotError::Encoding("truncated section".into()))?;
    if rest.len() < len {
        return Err(DepotError::Encoding(format!(
            "section of {len} bytes exceeds remaining {}",
            rest.len()
        )));
    }
    Ok(rest.split_at(len))
}

/// Decode an archive.
///
/// # Errors
///
/// Returns [`DepotError::Encoding`] on malformed varints, headers or CIDs.
pub fn decode(mut input: &[u8]) -> DepotResult<Archive> {
    let (header, rest) = next_section(input)?;
    let header: CarHeader = serde_ipld_dagcbor::from_slice(header)
        .map_err(|e| DepotError::Encoding(format!("car header: {e}")))?;
    if header.version != CAR_VERSION {
        return Err(DepotError::Encoding(format!(
            "unsupported car version {}",
            header.version
        )));
    }
    input = rest;

    let mut blocks = Vec::new();
    while !input.is_empty() {
        let (section, rest) = next_section(input)?;
        let mut cursor = std::io::Cursor::new(section);
        let cid = Cid::read_bytes(&mut cursor)
            .map_err(|e| DepotError::Encoding(format!("block cid: {e}")))?;
        let offset = usize::try_from(cursor.position())
            .map_err(|_| DepotError::Encoding("block cid too long".into()))?;
        let bytes = section.get(offset..).unwrap_or_default().to_vec();
        blocks.push(Block::new(cid, bytes));
        input = rest;
    }

    Ok(Archive {
        roots: header.roots,
        blocks,
    })
}
