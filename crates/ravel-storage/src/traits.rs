//! Storage trait for namespaced key-value access
//!
//! The DAO is generic over this trait so backends can be swapped and tests
//! can inject failing stores.

use crate::db::Batch;
use crate::error::StorageResult;

/// Namespaced byte-key/byte-value store with atomic batch commit and
/// conditional inserts.
///
/// Writers must be serialized externally: `put_if_not_exists` and the
/// conditional inserts inside [`write_batch`](KvStore::write_batch) are
/// check-then-write, which is sound only with at most one writer in
/// flight. Any number of readers may run concurrently.
pub trait KvStore {
    /// Acquire backend resources. Idempotent stores may reject a second
    /// open.
    fn open(&self) -> StorageResult<()>;

    /// Release backend resources.
    fn close(&self);

    /// Read the value for `key` in `namespace`; `Ok(None)` when absent.
    fn get(&self, namespace: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Write a value, overwriting any existing one.
    fn put(&self, namespace: &str, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Write a value only if the key is absent;
    /// [`StorageError::AlreadyExists`](crate::StorageError::AlreadyExists)
    /// otherwise.
    fn put_if_not_exists(&self, namespace: &str, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Apply a staged batch atomically. On error the store is unchanged.
    fn write_batch(&self, batch: Batch) -> StorageResult<()>;
}
