//! Block, transfer, and vote types for RavelLedger

use bytes::Bytes;
use ravel_crypto::keccak256;
use ravel_primitives::H256;

use crate::codec;

/// Block header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Protocol version
    pub version: u32,
    /// Chain the block belongs to
    pub chain_id: u32,
    /// Block height
    pub height: u64,
    /// Block timestamp (Unix seconds)
    pub timestamp: u64,
    /// Hash of the previous block
    pub prev_hash: H256,
}

/// Complete block: header plus ordered transfer and vote lists
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Transfers, in block order
    pub transfers: Vec<Transfer>,
    /// Votes, in block order
    pub votes: Vec<Vote>,
}

/// Value movement between two addresses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Sender account nonce
    pub nonce: u64,
    /// Amount moved, in base units
    pub amount: u128,
    /// Sender address
    pub sender: String,
    /// Recipient address
    pub recipient: String,
    /// Opaque payload
    pub payload: Bytes,
}

/// Delegation from a voter public key to a votee public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    /// Voter account nonce
    pub nonce: u64,
    /// Voter's compressed public key
    pub self_pubkey: Bytes,
    /// Votee's compressed public key
    pub vote_pubkey: Bytes,
}

impl Block {
    /// Create a new block
    pub fn new(header: BlockHeader, transfers: Vec<Transfer>, votes: Vec<Vote>) -> Self {
        Self {
            header,
            transfers,
            votes,
        }
    }

    /// Block height
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Content hash of the block over its full serialization
    pub fn hash(&self) -> H256 {
        keccak256(&codec::encode_block(self))
    }

    /// Serialize the block
    pub fn serialize(&self) -> Vec<u8> {
        codec::encode_block(self)
    }

    /// Deserialize a block; `None` if the bytes are not a valid encoding
    pub fn deserialize(bytes: &[u8]) -> Option<Self> {
        codec::decode_block(bytes)
    }
}

impl Transfer {
    /// Create a new transfer
    pub fn new(
        nonce: u64,
        amount: u128,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            nonce,
            amount,
            sender: sender.into(),
            recipient: recipient.into(),
            payload,
        }
    }

    /// Content hash of the transfer
    pub fn hash(&self) -> H256 {
        keccak256(&codec::encode_transfer(self))
    }
}

impl Vote {
    /// Create a new vote
    pub fn new(nonce: u64, self_pubkey: Bytes, vote_pubkey: Bytes) -> Self {
        Self {
            nonce,
            self_pubkey,
            vote_pubkey,
        }
    }

    /// Content hash of the vote
    pub fn hash(&self) -> H256 {
        keccak256(&codec::encode_vote(self))
    }
}
