//! Binary encoding/decoding for blocks, transfers, and votes.
//!
//! The encoding is deterministic and injective: fixed-width little-endian
//! integers, 4-byte length prefixes for variable fields, and decoders that
//! reject short buffers and trailing bytes. Both the block store and the
//! content hashes are built on it.

use bytes::Bytes;
use ravel_primitives::H256;

use crate::block::{Block, BlockHeader, Transfer, Vote};

// ============================================================================
// Encoding
// ============================================================================

/// Encode a block header to bytes.
pub fn encode_header(header: &BlockHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 4 + 8 + 8 + 32);
    buf.extend_from_slice(&header.version.to_le_bytes()); // 4
    buf.extend_from_slice(&header.chain_id.to_le_bytes()); // 4
    buf.extend_from_slice(&header.height.to_le_bytes()); // 8
    buf.extend_from_slice(&header.timestamp.to_le_bytes()); // 8
    buf.extend_from_slice(header.prev_hash.as_bytes()); // 32
    buf
}

/// Encode a transfer to bytes.
pub fn encode_transfer(transfer: &Transfer) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&transfer.nonce.to_le_bytes()); // 8
    buf.extend_from_slice(&transfer.amount.to_le_bytes()); // 16
    push_bytes(&mut buf, transfer.sender.as_bytes());
    push_bytes(&mut buf, transfer.recipient.as_bytes());
    push_bytes(&mut buf, &transfer.payload);
    buf
}

/// Encode a vote to bytes.
pub fn encode_vote(vote: &Vote) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&vote.nonce.to_le_bytes()); // 8
    push_bytes(&mut buf, &vote.self_pubkey);
    push_bytes(&mut buf, &vote.vote_pubkey);
    buf
}

/// Encode a full block to bytes.
pub fn encode_block(block: &Block) -> Vec<u8> {
    let mut buf = encode_header(&block.header);
    buf.extend_from_slice(&(block.transfers.len() as u32).to_le_bytes());
    for transfer in &block.transfers {
        buf.extend_from_slice(&encode_transfer(transfer));
    }
    buf.extend_from_slice(&(block.votes.len() as u32).to_le_bytes());
    for vote in &block.votes {
        buf.extend_from_slice(&encode_vote(vote));
    }
    buf
}

fn push_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a full block from bytes. `None` on a short buffer, an invalid
/// field, or trailing bytes after the final vote.
pub fn decode_block(bytes: &[u8]) -> Option<Block> {
    let mut pos = 0;
    let header = read_header(bytes, &mut pos)?;

    let transfer_count = read_u32(bytes, &mut pos)?;
    let mut transfers = Vec::with_capacity(transfer_count.min(1024) as usize);
    for _ in 0..transfer_count {
        transfers.push(read_transfer(bytes, &mut pos)?);
    }

    let vote_count = read_u32(bytes, &mut pos)?;
    let mut votes = Vec::with_capacity(vote_count.min(1024) as usize);
    for _ in 0..vote_count {
        votes.push(read_vote(bytes, &mut pos)?);
    }

    if pos != bytes.len() {
        return None;
    }
    Some(Block {
        header,
        transfers,
        votes,
    })
}

fn read_header(bytes: &[u8], pos: &mut usize) -> Option<BlockHeader> {
    Some(BlockHeader {
        version: read_u32(bytes, pos)?,
        chain_id: read_u32(bytes, pos)?,
        height: read_u64(bytes, pos)?,
        timestamp: read_u64(bytes, pos)?,
        prev_hash: read_h256(bytes, pos)?,
    })
}

fn read_transfer(bytes: &[u8], pos: &mut usize) -> Option<Transfer> {
    let nonce = read_u64(bytes, pos)?;
    let amount = read_u128(bytes, pos)?;
    let sender = String::from_utf8(read_bytes(bytes, pos)?.to_vec()).ok()?;
    let recipient = String::from_utf8(read_bytes(bytes, pos)?.to_vec()).ok()?;
    let payload = Bytes::copy_from_slice(read_bytes(bytes, pos)?);
    Some(Transfer {
        nonce,
        amount,
        sender,
        recipient,
        payload,
    })
}

fn read_vote(bytes: &[u8], pos: &mut usize) -> Option<Vote> {
    let nonce = read_u64(bytes, pos)?;
    let self_pubkey = Bytes::copy_from_slice(read_bytes(bytes, pos)?);
    let vote_pubkey = Bytes::copy_from_slice(read_bytes(bytes, pos)?);
    Some(Vote {
        nonce,
        self_pubkey,
        vote_pubkey,
    })
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Option<u32> {
    let value = u32::from_le_bytes(bytes.get(*pos..*pos + 4)?.try_into().ok()?);
    *pos += 4;
    Some(value)
}

fn read_u64(bytes: &[u8], pos: &mut usize) -> Option<u64> {
    let value = u64::from_le_bytes(bytes.get(*pos..*pos + 8)?.try_into().ok()?);
    *pos += 8;
    Some(value)
}

fn read_u128(bytes: &[u8], pos: &mut usize) -> Option<u128> {
    let value = u128::from_le_bytes(bytes.get(*pos..*pos + 16)?.try_into().ok()?);
    *pos += 16;
    Some(value)
}

fn read_h256(bytes: &[u8], pos: &mut usize) -> Option<H256> {
    let value = H256::from_slice(bytes.get(*pos..*pos + 32)?).ok()?;
    *pos += 32;
    Some(value)
}

fn read_bytes<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let len = read_u32(bytes, pos)? as usize;
    let slice = bytes.get(*pos..*pos + len)?;
    *pos += len;
    Some(slice)
}
