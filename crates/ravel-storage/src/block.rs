//! Block data-access layer
//!
//! [`BlockDao`] maps the linear block sequence onto the KV namespaces in
//! [`schema`](crate::schema): blocks by hash, reciprocal hash<->height
//! mappings, transfer/vote -> block mappings, per-address index entries
//! with gap-free sequence numbers, and the global singleton counters.
//! All writes for one block go through a single atomic batch.
//!
//! At most one `put_block` may be in flight at a time; the singleton
//! counters are read-modify-write across the batch boundary. Readers may
//! run concurrently with themselves and with the single writer.

use std::collections::HashMap;

use ravel_crypto::derive_address;
use ravel_primitives::H256;
use ravel_types::Block;

use crate::db::Batch;
use crate::error::{StorageError, StorageResult};
use crate::schema::{self, ns};
use crate::traits::KvStore;

/// Chain parameters used when deriving vote addresses from public keys
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Chain identifier baked into derived addresses
    pub chain_id: u32,
    /// Derive testnet addresses
    pub testnet: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            testnet: false,
        }
    }
}

/// Block data-access layer over a namespaced KV store
pub struct BlockDao<K: KvStore> {
    kv: K,
    chain: ChainConfig,
}

impl<K: KvStore> BlockDao<K> {
    /// Create a new DAO over the given store. The store is not opened
    /// until [`start`](BlockDao::start).
    pub fn new(kv: K, chain: ChainConfig) -> Self {
        Self { kv, chain }
    }

    /// Get the underlying store
    pub fn kv(&self) -> &K {
        &self.kv
    }

    // ========== Lifecycle ==========

    /// Open the store and seed the singleton counters on first start.
    ///
    /// A counter that already exists is left untouched (non-fresh
    /// database); any other store error closes the store again and is
    /// returned.
    pub fn start(&self) -> StorageResult<()> {
        self.kv.open()?;
        if let Err(e) = self.seed_counters() {
            self.kv.close();
            return Err(e);
        }
        tracing::info!("block DAO started");
        Ok(())
    }

    /// Close the store
    pub fn stop(&self) {
        self.kv.close();
        tracing::info!("block DAO stopped");
    }

    fn seed_counters(&self) -> StorageResult<()> {
        for (key, what) in [
            (schema::TOP_HEIGHT_KEY, "top height"),
            (schema::TOTAL_TRANSFERS_KEY, "total transfers"),
            (schema::TOTAL_VOTES_KEY, "total votes"),
        ] {
            match self.kv.put_if_not_exists(ns::BLOCKS, key, &schema::encode_u64(0)) {
                Ok(()) => tracing::info!(counter = what, "seeded singleton counter"),
                Err(StorageError::AlreadyExists) => {} // non-fresh database
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    // ========== Read API ==========

    /// Get the block hash at a height
    pub fn get_block_hash(&self, height: u64) -> StorageResult<H256> {
        let key = schema::height_key(height);
        let value = self
            .kv
            .get(ns::BLOCK_HASH_HEIGHT, &key)?
            .ok_or_else(|| StorageError::NotFound(format!("hash for block at height {height}")))?;
        H256::from_slice(&value).map_err(|_| StorageError::Corrupt {
            what: format!("hash for block at height {height}"),
            expected: H256::LEN,
            got: value.len(),
        })
    }

    /// Get the height of a block by hash
    pub fn get_block_height(&self, hash: &H256) -> StorageResult<u64> {
        let key = schema::hash_key(hash);
        let value = self
            .kv
            .get(ns::BLOCK_HASH_HEIGHT, &key)?
            .ok_or_else(|| StorageError::NotFound(format!("height for block {hash}")))?;
        schema::decode_u64(&value).ok_or_else(|| StorageError::Corrupt {
            what: format!("height for block {hash}"),
            expected: schema::U64_LEN,
            got: value.len(),
        })
    }

    /// Get a block by hash
    pub fn get_block(&self, hash: &H256) -> StorageResult<Block> {
        let value = self
            .kv
            .get(ns::BLOCKS, hash.as_bytes())?
            .ok_or_else(|| StorageError::NotFound(format!("block {hash}")))?;
        Block::deserialize(&value)
            .ok_or_else(|| StorageError::Deserialization(format!("block {hash}")))
    }

    /// Get a block by height
    pub fn get_block_by_height(&self, height: u64) -> StorageResult<Block> {
        let hash = self.get_block_hash(height)?;
        self.get_block(&hash)
    }

    /// Get the hash of the block containing a transfer
    pub fn get_block_hash_by_transfer_hash(&self, tx_hash: &H256) -> StorageResult<H256> {
        let key = schema::transfer_key(tx_hash);
        let value = self
            .kv
            .get(ns::TRANSFER_BLOCK, &key)?
            .ok_or_else(|| StorageError::NotFound(format!("block for transfer {tx_hash}")))?;
        H256::from_slice(&value).map_err(|_| StorageError::Corrupt {
            what: format!("block hash for transfer {tx_hash}"),
            expected: H256::LEN,
            got: value.len(),
        })
    }

    /// Get the hash of the block containing a vote
    pub fn get_block_hash_by_vote_hash(&self, vote_hash: &H256) -> StorageResult<H256> {
        let key = schema::vote_key(vote_hash);
        let value = self
            .kv
            .get(ns::VOTE_BLOCK, &key)?
            .ok_or_else(|| StorageError::NotFound(format!("block for vote {vote_hash}")))?;
        H256::from_slice(&value).map_err(|_| StorageError::Corrupt {
            what: format!("block hash for vote {vote_hash}"),
            expected: H256::LEN,
            got: value.len(),
        })
    }

    /// Number of transfers sent by an address
    pub fn get_transfer_count_by_sender(&self, address: &str) -> StorageResult<u64> {
        self.address_count(
            ns::ADDRESS_TRANSFER_COUNT,
            schema::TRANSFER_FROM_PREFIX,
            address,
            "transfer count for sender",
        )
    }

    /// Number of transfers received by an address
    pub fn get_transfer_count_by_recipient(&self, address: &str) -> StorageResult<u64> {
        self.address_count(
            ns::ADDRESS_TRANSFER_COUNT,
            schema::TRANSFER_TO_PREFIX,
            address,
            "transfer count for recipient",
        )
    }

    /// Hashes of all transfers sent by an address, in insertion order
    pub fn get_transfers_by_sender(&self, address: &str) -> StorageResult<Vec<H256>> {
        let count = self.get_transfer_count_by_sender(address)?;
        self.address_hashes(ns::ADDRESS_TRANSFER, schema::TRANSFER_FROM_PREFIX, address, count)
    }

    /// Hashes of all transfers received by an address, in insertion order
    pub fn get_transfers_by_recipient(&self, address: &str) -> StorageResult<Vec<H256>> {
        let count = self.get_transfer_count_by_recipient(address)?;
        self.address_hashes(ns::ADDRESS_TRANSFER, schema::TRANSFER_TO_PREFIX, address, count)
    }

    /// Number of votes cast by an address
    pub fn get_vote_count_by_sender(&self, address: &str) -> StorageResult<u64> {
        self.address_count(
            ns::ADDRESS_VOTE_COUNT,
            schema::VOTE_FROM_PREFIX,
            address,
            "vote count for sender",
        )
    }

    /// Number of votes received by an address
    pub fn get_vote_count_by_recipient(&self, address: &str) -> StorageResult<u64> {
        self.address_count(
            ns::ADDRESS_VOTE_COUNT,
            schema::VOTE_TO_PREFIX,
            address,
            "vote count for recipient",
        )
    }

    /// Hashes of all votes cast by an address, in insertion order
    pub fn get_votes_by_sender(&self, address: &str) -> StorageResult<Vec<H256>> {
        let count = self.get_vote_count_by_sender(address)?;
        self.address_hashes(ns::ADDRESS_VOTE, schema::VOTE_FROM_PREFIX, address, count)
    }

    /// Hashes of all votes received by an address, in insertion order
    pub fn get_votes_by_recipient(&self, address: &str) -> StorageResult<Vec<H256>> {
        let count = self.get_vote_count_by_recipient(address)?;
        self.address_hashes(ns::ADDRESS_VOTE, schema::VOTE_TO_PREFIX, address, count)
    }

    /// Largest stored block height
    pub fn get_blockchain_height(&self) -> StorageResult<u64> {
        self.singleton(schema::TOP_HEIGHT_KEY, "blockchain height")
    }

    /// Total number of stored transfers
    pub fn get_total_transfers(&self) -> StorageResult<u64> {
        self.singleton(schema::TOTAL_TRANSFERS_KEY, "total transfers")
    }

    /// Total number of stored votes
    pub fn get_total_votes(&self) -> StorageResult<u64> {
        self.singleton(schema::TOTAL_VOTES_KEY, "total votes")
    }

    /// Read a per-address counter. An absent counter is a legitimately
    /// unknown address and reads as zero; an empty or short value is
    /// corrupt.
    fn address_count(
        &self,
        count_ns: &str,
        direction: &[u8],
        address: &str,
        what: &str,
    ) -> StorageResult<u64> {
        let key = schema::address_count_key(direction, address);
        match self.kv.get(count_ns, &key)? {
            None => Ok(0),
            Some(value) => schema::decode_u64(&value).ok_or_else(|| StorageError::Corrupt {
                what: format!("{what} {address}"),
                expected: schema::U64_LEN,
                got: value.len(),
            }),
        }
    }

    /// Collect the hashes at sequences `0..count`. A missing or short
    /// entry inside the range means the sequence invariant is broken.
    fn address_hashes(
        &self,
        entry_ns: &str,
        direction: &[u8],
        address: &str,
        count: u64,
    ) -> StorageResult<Vec<H256>> {
        let mut hashes = Vec::with_capacity(count as usize);
        for sequence in 0..count {
            let key = schema::address_entry_key(direction, address, sequence);
            let value = self
                .kv
                .get(entry_ns, &key)?
                .ok_or_else(|| StorageError::Corrupt {
                    what: format!("index entry {sequence} for address {address}"),
                    expected: H256::LEN,
                    got: 0,
                })?;
            let hash = H256::from_slice(&value).map_err(|_| StorageError::Corrupt {
                what: format!("index entry {sequence} for address {address}"),
                expected: H256::LEN,
                got: value.len(),
            })?;
            hashes.push(hash);
        }
        Ok(hashes)
    }

    fn singleton(&self, key: &[u8], what: &str) -> StorageResult<u64> {
        let value = self
            .kv
            .get(ns::BLOCKS, key)?
            .ok_or_else(|| StorageError::NotFound(what.to_string()))?;
        schema::decode_u64(&value).ok_or_else(|| StorageError::Corrupt {
            what: what.to_string(),
            expected: schema::U64_LEN,
            got: value.len(),
        })
    }

    // ========== Write API ==========

    /// Insert a block and all its secondary indexes atomically.
    ///
    /// Re-inserting a block whose hash is already stored is a no-op: the
    /// payload, mappings, totals, and address indexes are pure functions
    /// of the block, and bumping the counters again would corrupt them.
    pub fn put_block(&self, block: &Block) -> StorageResult<()> {
        let hash = block.hash();
        if self.kv.get(ns::BLOCKS, hash.as_bytes())?.is_some() {
            tracing::debug!(hash = %hash, "block already stored, skipping");
            return Ok(());
        }

        let height = block.height();
        let height_bytes = schema::encode_u64(height);
        let serialized = block.serialize();

        let mut batch = Batch::new();
        batch.put_if_not_exists(
            ns::BLOCKS,
            hash.as_bytes().to_vec(),
            serialized,
            format!("failed to put block {hash}"),
        );
        batch.put(
            ns::BLOCK_HASH_HEIGHT,
            schema::hash_key(&hash),
            height_bytes.to_vec(),
            format!("failed to put hash -> height mapping for block {hash}"),
        );
        batch.put(
            ns::BLOCK_HASH_HEIGHT,
            schema::height_key(height),
            hash.as_bytes().to_vec(),
            format!("failed to put height -> hash mapping for block {hash}"),
        );

        // Out-of-order inserts are indexed but never lower the top height.
        let top_height = self.get_blockchain_height()?;
        if height > top_height {
            batch.put(
                ns::BLOCKS,
                schema::TOP_HEIGHT_KEY.to_vec(),
                height_bytes.to_vec(),
                "failed to put top height",
            );
        }

        let total_transfers = self.get_total_transfers()? + block.transfers.len() as u64;
        batch.put(
            ns::BLOCKS,
            schema::TOTAL_TRANSFERS_KEY.to_vec(),
            schema::encode_u64(total_transfers).to_vec(),
            "failed to put total transfers",
        );

        let total_votes = self.get_total_votes()? + block.votes.len() as u64;
        batch.put(
            ns::BLOCKS,
            schema::TOTAL_VOTES_KEY.to_vec(),
            schema::encode_u64(total_votes).to_vec(),
            "failed to put total votes",
        );

        for transfer in &block.transfers {
            let tx_hash = transfer.hash();
            batch.put(
                ns::TRANSFER_BLOCK,
                schema::transfer_key(&tx_hash),
                hash.as_bytes().to_vec(),
                format!("failed to put transfer {tx_hash}"),
            );
        }

        for vote in &block.votes {
            let vote_hash = vote.hash();
            batch.put(
                ns::VOTE_BLOCK,
                schema::vote_key(&vote_hash),
                hash.as_bytes().to_vec(),
                format!("failed to put vote {vote_hash}"),
            );
        }

        self.stage_transfer_index(block, &mut batch)?;
        self.stage_vote_index(block, &mut batch)?;

        tracing::debug!(hash = %hash, height, ops = batch.len(), "committing block");
        self.kv.write_batch(batch)
    }

    /// Stage per-address transfer index entries and counter bumps.
    fn stage_transfer_index(&self, block: &Block, batch: &mut Batch) -> StorageResult<()> {
        let mut next_from: HashMap<String, u64> = HashMap::new();
        let mut next_to: HashMap<String, u64> = HashMap::new();

        for transfer in &block.transfers {
            let tx_hash = transfer.hash();

            let sequence = self.next_sequence(
                &mut next_from,
                ns::ADDRESS_TRANSFER_COUNT,
                schema::TRANSFER_FROM_PREFIX,
                &transfer.sender,
                "transfer count for sender",
            )?;
            stage_address_entry(
                batch,
                ns::ADDRESS_TRANSFER,
                ns::ADDRESS_TRANSFER_COUNT,
                schema::TRANSFER_FROM_PREFIX,
                &transfer.sender,
                sequence,
                &tx_hash,
            );

            let sequence = self.next_sequence(
                &mut next_to,
                ns::ADDRESS_TRANSFER_COUNT,
                schema::TRANSFER_TO_PREFIX,
                &transfer.recipient,
                "transfer count for recipient",
            )?;
            stage_address_entry(
                batch,
                ns::ADDRESS_TRANSFER,
                ns::ADDRESS_TRANSFER_COUNT,
                schema::TRANSFER_TO_PREFIX,
                &transfer.recipient,
                sequence,
                &tx_hash,
            );
        }

        Ok(())
    }

    /// Stage per-address vote index entries and counter bumps. Voter and
    /// votee addresses are derived from the vote public keys; a
    /// derivation failure abandons the batch uncommitted.
    fn stage_vote_index(&self, block: &Block, batch: &mut Batch) -> StorageResult<()> {
        let mut next_from: HashMap<String, u64> = HashMap::new();
        let mut next_to: HashMap<String, u64> = HashMap::new();

        for vote in &block.votes {
            let vote_hash = vote.hash();
            let voter = derive_address(&vote.self_pubkey, self.chain.testnet, self.chain.chain_id)?;
            let votee = derive_address(&vote.vote_pubkey, self.chain.testnet, self.chain.chain_id)?;

            let sequence = self.next_sequence(
                &mut next_from,
                ns::ADDRESS_VOTE_COUNT,
                schema::VOTE_FROM_PREFIX,
                &voter,
                "vote count for sender",
            )?;
            stage_address_entry(
                batch,
                ns::ADDRESS_VOTE,
                ns::ADDRESS_VOTE_COUNT,
                schema::VOTE_FROM_PREFIX,
                &voter,
                sequence,
                &vote_hash,
            );

            let sequence = self.next_sequence(
                &mut next_to,
                ns::ADDRESS_VOTE_COUNT,
                schema::VOTE_TO_PREFIX,
                &votee,
                "vote count for recipient",
            )?;
            stage_address_entry(
                batch,
                ns::ADDRESS_VOTE,
                ns::ADDRESS_VOTE_COUNT,
                schema::VOTE_TO_PREFIX,
                &votee,
                sequence,
                &vote_hash,
            );
        }

        Ok(())
    }

    /// Next free sequence number for an address within the batch being
    /// built. The on-disk counter is read once per address; later
    /// occurrences take their sequence from the in-memory map, so entries
    /// staged for one block occupy contiguous, distinct sequences.
    fn next_sequence(
        &self,
        next: &mut HashMap<String, u64>,
        count_ns: &str,
        direction: &[u8],
        address: &str,
        what: &str,
    ) -> StorageResult<u64> {
        let sequence = match next.get(address) {
            Some(&sequence) => sequence,
            None => self.address_count(count_ns, direction, address, what)?,
        };
        next.insert(address.to_string(), sequence + 1);
        Ok(sequence)
    }
}

/// Stage one `(direction, address, sequence) -> hash` entry plus the
/// counter bump. The entry is a conditional insert; the counter write is
/// unconditional, and the last staged write equals the final count.
fn stage_address_entry(
    batch: &mut Batch,
    entry_ns: &str,
    count_ns: &str,
    direction: &[u8],
    address: &str,
    sequence: u64,
    tx_hash: &H256,
) {
    batch.put_if_not_exists(
        entry_ns,
        schema::address_entry_key(direction, address, sequence),
        tx_hash.as_bytes().to_vec(),
        format!("failed to put index entry {sequence} for address {address}"),
    );
    batch.put(
        count_ns,
        schema::address_count_key(direction, address),
        schema::encode_u64(sequence + 1).to_vec(),
        format!("failed to bump count for address {address}"),
    );
}
