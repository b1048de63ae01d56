//! On-disk schema: namespaces, key prefixes, singleton keys, and key
//! builders.
//!
//! The layout below is the compatibility surface of the store. Hashes are
//! stored as raw 32 bytes; heights, counts, and sequence numbers are 8-byte
//! **little-endian** integers; addresses are embedded as their UTF-8 bytes.

use ravel_primitives::H256;

/// Namespace names. Each namespace is an independent keyspace (one RocksDB
/// column family).
pub mod ns {
    /// Serialized blocks by hash, plus the singleton counters
    pub const BLOCKS: &str = "blocks";
    /// Reciprocal hash->height and height->hash mappings
    pub const BLOCK_HASH_HEIGHT: &str = "hash<->height";
    /// Transfer hash -> containing block hash
    pub const TRANSFER_BLOCK: &str = "transfer<->block";
    /// Vote hash -> containing block hash
    pub const VOTE_BLOCK: &str = "vote<->block";
    /// (direction, address, sequence) -> transfer hash
    pub const ADDRESS_TRANSFER: &str = "address<->transfer";
    /// (direction, address) -> transfer count
    pub const ADDRESS_TRANSFER_COUNT: &str = "address<->transfercount";
    /// (direction, address, sequence) -> vote hash
    pub const ADDRESS_VOTE: &str = "address<->vote";
    /// (direction, address) -> vote count
    pub const ADDRESS_VOTE_COUNT: &str = "address<->votecount";
}

/// All namespace names
pub const ALL_NAMESPACES: &[&str] = &[
    ns::BLOCKS,
    ns::BLOCK_HASH_HEIGHT,
    ns::TRANSFER_BLOCK,
    ns::VOTE_BLOCK,
    ns::ADDRESS_TRANSFER,
    ns::ADDRESS_TRANSFER_COUNT,
    ns::ADDRESS_VOTE,
    ns::ADDRESS_VOTE_COUNT,
];

/// Prefix for hash->height keys
pub const HASH_PREFIX: &[u8] = b"hash.";
/// Prefix for height->hash keys
pub const HEIGHT_PREFIX: &[u8] = b"height.";
/// Prefix for transfer->block keys
pub const TRANSFER_PREFIX: &[u8] = b"transfer.";
/// Prefix for vote->block keys
pub const VOTE_PREFIX: &[u8] = b"vote.";
/// Direction prefix for transfers sent by an address
pub const TRANSFER_FROM_PREFIX: &[u8] = b"transfer-from.";
/// Direction prefix for transfers received by an address
pub const TRANSFER_TO_PREFIX: &[u8] = b"transfer-to.";
/// Direction prefix for votes cast by an address
pub const VOTE_FROM_PREFIX: &[u8] = b"vote-from.";
/// Direction prefix for votes received by an address
pub const VOTE_TO_PREFIX: &[u8] = b"vote-to.";

/// Singleton key for the largest stored block height, in [`ns::BLOCKS`].
/// Mutated only inside `put_block`.
pub const TOP_HEIGHT_KEY: &[u8] = b"top-height";
/// Singleton key for the total transfer count, in [`ns::BLOCKS`].
/// Mutated only inside `put_block`.
pub const TOTAL_TRANSFERS_KEY: &[u8] = b"total-transfers";
/// Singleton key for the total vote count, in [`ns::BLOCKS`].
/// Mutated only inside `put_block`.
pub const TOTAL_VOTES_KEY: &[u8] = b"total-votes";

/// Width of an encoded integer in bytes
pub const U64_LEN: usize = 8;

/// Encode an integer for storage (8-byte little-endian)
pub fn encode_u64(value: u64) -> [u8; U64_LEN] {
    value.to_le_bytes()
}

/// Decode a stored integer; `None` if the value is not exactly 8 bytes
pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Key for the hash->height mapping: `"hash." ++ hash`
pub fn hash_key(hash: &H256) -> Vec<u8> {
    concat(HASH_PREFIX, hash.as_bytes())
}

/// Key for the height->hash mapping: `"height." ++ height`
pub fn height_key(height: u64) -> Vec<u8> {
    concat(HEIGHT_PREFIX, &encode_u64(height))
}

/// Key for the transfer->block mapping: `"transfer." ++ txhash`
pub fn transfer_key(tx_hash: &H256) -> Vec<u8> {
    concat(TRANSFER_PREFIX, tx_hash.as_bytes())
}

/// Key for the vote->block mapping: `"vote." ++ votehash`
pub fn vote_key(vote_hash: &H256) -> Vec<u8> {
    concat(VOTE_PREFIX, vote_hash.as_bytes())
}

/// Per-address counter key: `direction ++ address`
pub fn address_count_key(direction: &[u8], address: &str) -> Vec<u8> {
    concat(direction, address.as_bytes())
}

/// Per-address index entry key: `direction ++ address ++ sequence`
pub fn address_entry_key(direction: &[u8], address: &str, sequence: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(direction.len() + address.len() + U64_LEN);
    key.extend_from_slice(direction);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&encode_u64(sequence));
    key
}

fn concat(prefix: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + payload.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(payload);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_codec_roundtrip() {
        for value in [0u64, 1, 255, 256, u64::MAX] {
            let encoded = encode_u64(value);
            assert_eq!(encoded.len(), U64_LEN);
            assert_eq!(decode_u64(&encoded), Some(value));
        }
    }

    #[test]
    fn test_u64_codec_is_little_endian() {
        assert_eq!(encode_u64(1), [1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_u64_rejects_wrong_length() {
        assert_eq!(decode_u64(&[0u8; 7]), None);
        assert_eq!(decode_u64(&[0u8; 9]), None);
        assert_eq!(decode_u64(&[]), None);
    }

    #[test]
    fn test_hash_and_height_keys() {
        let hash = H256::from_bytes([0x42; 32]);
        let hkey = hash_key(&hash);
        assert!(hkey.starts_with(b"hash."));
        assert_eq!(&hkey[5..], hash.as_bytes());

        let key = height_key(3);
        assert!(key.starts_with(b"height."));
        assert_eq!(decode_u64(&key[7..]), Some(3));
    }

    #[test]
    fn test_address_entry_key_layout() {
        let key = address_entry_key(TRANSFER_FROM_PREFIX, "alice", 2);
        assert!(key.starts_with(b"transfer-from.alice"));
        assert_eq!(decode_u64(&key[b"transfer-from.alice".len()..]), Some(2));
    }

    #[test]
    fn test_address_entry_keys_distinct_per_sequence() {
        let a = address_entry_key(VOTE_TO_PREFIX, "alice", 0);
        let b = address_entry_key(VOTE_TO_PREFIX, "alice", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_count_key_is_entry_key_prefix() {
        // The counter key and every entry key share the direction+address
        // prefix; the 8-byte sequence suffix keeps them distinct.
        let count = address_count_key(TRANSFER_TO_PREFIX, "bob");
        let entry = address_entry_key(TRANSFER_TO_PREFIX, "bob", 0);
        assert!(entry.starts_with(&count));
        assert_eq!(entry.len(), count.len() + U64_LEN);
    }

    #[test]
    fn test_namespace_names() {
        assert_eq!(ALL_NAMESPACES.len(), 8);
        assert!(ALL_NAMESPACES.contains(&"blocks"));
        assert!(ALL_NAMESPACES.contains(&"hash<->height"));
        assert!(ALL_NAMESPACES.contains(&"address<->transfercount"));
    }
}
